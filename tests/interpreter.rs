//! Command interpreter and dispatcher tests

use std::path::PathBuf;

use chrono::NaiveDate;
use gaia::agent::{APOLOGY, CommandDispatcher};
use gaia::automation::DesktopAutomation;
use gaia::config::{AutomationSettings, EmailSettings};
use gaia::interpreter::{CommandResult, interpret_at};

mod common;

use common::{MockAutomation, MockLlm};

fn noon() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(9, 7, 0)
        .unwrap()
}

fn say(result: Option<CommandResult>) -> String {
    match result {
        Some(CommandResult::Say(text)) => text,
        other => panic!("expected a single utterance, got {other:?}"),
    }
}

#[test]
fn test_time_and_date_formatting() {
    let automation = MockAutomation::new();

    let time = interpret_at("what time is it", &automation, noon()).unwrap();
    assert_eq!(say(time), "The current time is 09:07 AM");

    let date = interpret_at("what's today", &automation, noon()).unwrap();
    assert_eq!(say(date), "Today is Tuesday, March 05, 2024");
}

#[test]
fn test_program_list_is_a_sequence() {
    let automation = MockAutomation::new();
    let result = interpret_at("Which programs can I open", &automation, noon()).unwrap();

    match result {
        Some(CommandResult::Sequence(lines)) => {
            assert!(lines[0].starts_with("You can open these programs"));
            assert!(lines.len() > 3);
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(automation.opened.lock().unwrap().is_empty());
}

#[test]
fn test_open_email_with_unreachable_inbox() {
    let automation = MockAutomation::new();
    let result = interpret_at("open outlook", &automation, noon()).unwrap();

    assert_eq!(
        result,
        Some(CommandResult::Sequence(vec![
            "Opened outlook".to_string(),
            "Outlook opened, but couldn't retrieve emails at this time.".to_string(),
        ]))
    );
}

#[test]
fn test_check_email_lists_summaries_only() {
    let automation = MockAutomation::new().with_inbox(&[
        "From: A, Subject: 1",
        "From: B, Subject: 2",
        "From: C, Subject: 3",
        "From: D, Subject: 4",
        "From: E, Subject: 5",
        "From: F, Subject: 6",
    ]);
    let result = interpret_at("check emails", &automation, noon()).unwrap();

    match result {
        Some(CommandResult::Sequence(lines)) => {
            assert_eq!(lines.len(), 5);
            assert_eq!(lines[0], "From: A, Subject: 1");
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(automation.opened.lock().unwrap().is_empty());
}

#[test]
fn test_unreadable_inbox_is_an_error() {
    let automation = MockAutomation::new();
    assert!(interpret_at("any new mail", &automation, noon()).is_err());
}

#[test]
fn test_empty_inbox_falls_through() {
    let automation = MockAutomation::new().with_inbox(&[]);
    let result = interpret_at("check my email", &automation, noon()).unwrap();
    assert_eq!(result, None);
}

#[test]
fn test_dispatcher_apologizes_when_inbox_unreadable() {
    let (llm, prompts) = MockLlm::new(Some("unused"));
    let mut dispatcher = CommandDispatcher::new(Box::new(MockAutomation::new()), Box::new(llm));

    assert_eq!(dispatcher.handle("check my email", Some("Sam")), vec![APOLOGY]);
    assert!(prompts.lock().unwrap().is_empty());
}

#[test]
fn test_dispatcher_asks_model_about_empty_inbox() {
    let (llm, prompts) = MockLlm::new(Some("Nothing new today."));
    let automation = MockAutomation::new().with_inbox(&[]);
    let mut dispatcher = CommandDispatcher::new(Box::new(automation), Box::new(llm));

    assert_eq!(
        dispatcher.handle("check my email", Some("Sam")),
        vec!["Nothing new today."]
    );
    assert_eq!(prompts.lock().unwrap().len(), 1);
}

#[test]
fn test_excel_creates_spreadsheet() {
    let automation = MockAutomation::new();
    let result = interpret_at("make an Excel sheet", &automation, noon()).unwrap();

    assert_eq!(say(result), "Excel file created at ai_created.xlsx");
    assert_eq!(
        automation.created.lock().unwrap().as_slice(),
        [PathBuf::from("ai_created.xlsx")]
    );
}

#[test]
fn test_word_open_versus_create() {
    let automation = MockAutomation::new();

    let opened = interpret_at("please open word", &automation, noon()).unwrap();
    assert_eq!(say(opened), "Opened word");

    let created = interpret_at("create document", &automation, noon()).unwrap();
    assert_eq!(say(created), "Word document created at ai_created.docx");

    // Anything else mentioning a document defaults to creating one
    let biased = interpret_at("read my document", &automation, noon()).unwrap();
    assert_eq!(say(biased), "Word document created at ai_created.docx");
}

#[test]
fn test_open_named_program() {
    let automation = MockAutomation::new();
    let result = interpret_at("Open Calculator", &automation, noon()).unwrap();

    assert_eq!(say(result), "Opened calculator");
    assert_eq!(automation.opened.lock().unwrap().as_slice(), ["calculator"]);
}

#[test]
fn test_questions_about_opening_fall_through() {
    let automation = MockAutomation::new();
    for utterance in [
        "can you open programs",
        "what should I open",
        "open how to cook",
        "open the pod bay doors?",
    ] {
        assert_eq!(
            interpret_at(utterance, &automation, noon()).unwrap(),
            None,
            "{utterance}"
        );
    }
    assert!(automation.opened.lock().unwrap().is_empty());
}

#[test]
fn test_automation_error_propagates() {
    let automation = MockAutomation {
        fail_documents: true,
        ..MockAutomation::new()
    };
    assert!(interpret_at("excel", &automation, noon()).is_err());
}

#[test]
fn test_dispatcher_prompt_without_name() {
    let (llm, prompts) = MockLlm::new(Some("Sure."));
    let mut dispatcher = CommandDispatcher::new(Box::new(MockAutomation::new()), Box::new(llm));

    let replies = dispatcher.handle("how far is the moon", None);

    assert_eq!(replies, vec!["Sure."]);
    assert_eq!(
        prompts.lock().unwrap().as_slice(),
        ["there said: how far is the moon. Provide a helpful response."]
    );
}

#[test]
fn test_dispatcher_apologizes_for_automation_errors() {
    let (llm, prompts) = MockLlm::new(Some("unused"));
    let automation = MockAutomation {
        fail_documents: true,
        ..MockAutomation::new()
    };
    let mut dispatcher = CommandDispatcher::new(Box::new(automation), Box::new(llm));

    assert_eq!(dispatcher.handle("new document", Some("Sam")), vec![APOLOGY]);
    assert!(prompts.lock().unwrap().is_empty());
}

#[test]
fn test_desktop_automation_writes_into_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let automation = DesktopAutomation::new(
        AutomationSettings {
            output_dir: dir.path().to_path_buf(),
            mail_client: "outlook".to_string(),
            text_editor: "gedit".to_string(),
        },
        &EmailSettings {
            host: None,
            port: 993,
            user: String::new(),
            password: None,
            mailbox: "INBOX".to_string(),
        },
    );

    let result = interpret_at("new word document", &automation, noon()).unwrap();
    let expected = dir.path().join("ai_created.docx");

    assert_eq!(
        say(result),
        format!("Word document created at {}", expected.display())
    );
    assert!(expected.exists());
}
