//! Command interpreter
//!
//! Routes a transcribed utterance to a built-in command. Matching is split in
//! two halves: [`classify`] is a pure function over the rule tables below, and
//! [`execute`] performs the automation call for the chosen [`Command`].
//! An utterance that matches nothing yields `None` and is left to the language
//! model.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;

use crate::Result;
use crate::automation::Automation;

/// Program-list queries; every phrase of a group must be present
const PROGRAM_LIST_QUERIES: &[&[&str]] = &[
    &["what programs", "open"],
    &["which programs", "open"],
    &["list programs"],
    &["available programs"],
];

const EMAIL_KEYWORDS: &[&str] = &["email", "outlook", "mail", "show me emails", "check emails"];

const SPREADSHEET_KEYWORDS: &[&str] = &["excel"];

const DOCUMENT_KEYWORDS: &[&str] = &["word", "document", "doc"];

const WORD_OPEN_PHRASES: &[&str] = &[
    "open word",
    "launch word",
    "start word",
    "open microsoft word",
    "run word",
];

const WORD_CREATE_PHRASES: &[&str] = &[
    "create document",
    "new document",
    "make document",
    "create word document",
    "new word document",
];

/// Utterances that open the word processor when said on their own
const BARE_DOCUMENT_WORDS: &[&str] = &["word", "document", "doc"];

/// Markers of a question about opening rather than a request to open
const OPEN_QUESTION_MARKERS: &[&str] = &["can you", "which", "what", "?"];

/// Words that cannot appear in a program name
const PROGRAM_NAME_STOPWORDS: &[&str] = &["can", "you", "which", "what", "how", "verbally", "?"];

const PROGRAM_HELP: &[&str] = &[
    "You can open these programs by saying 'open' followed by:",
    "• Excel - Creates a new Excel spreadsheet",
    "• Word or Document - Creates a new Word document",
    "• Outlook - Opens Outlook and shows recent emails",
    "• Any program name like 'notepad', 'calculator', 'chrome', etc.",
    "You can also ask me to:",
    "• Check emails or show emails",
    "• Get the current time or date",
    "• Have general conversations about any topic",
];

/// Number of inbox messages read for email commands
pub const INBOX_LIMIT: usize = 5;

/// File name for spreadsheets created by voice
pub const SPREADSHEET_FILE: &str = "ai_created.xlsx";

/// File name for documents created by voice
pub const DOCUMENT_FILE: &str = "ai_created.docx";

/// Paragraph written into voice-created documents
pub const DOCUMENT_TEXT: &str = "Hello from AI Agent!";

static OPEN_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"open (.+)").expect("valid regex"));

/// A recognized built-in command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Say the current time
    Time,
    /// Say today's date
    Date,
    /// Describe what can be opened
    ListPrograms,
    /// Read the inbox, opening the mail client first if asked
    Email { open_client: bool },
    /// Create a spreadsheet
    CreateSpreadsheet,
    /// Open the word processor
    OpenWordProcessor,
    /// Create a document
    CreateDocument,
    /// Open a named program
    OpenProgram(String),
    /// Open the default text editor
    OpenTextEditor,
}

/// What the assistant says in reply to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// One utterance
    Say(String),
    /// Several utterances, spoken in order
    Sequence(Vec<String>),
}

impl CommandResult {
    /// Whether there is nothing to say
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Say(text) => text.is_empty(),
            Self::Sequence(items) => items.is_empty(),
        }
    }

    /// The utterances to speak, in order
    #[must_use]
    pub fn into_utterances(self) -> Vec<String> {
        match self {
            Self::Say(text) => vec![text],
            Self::Sequence(items) => items,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Match an utterance against the rule tables
///
/// Rules are checked in order of precedence; the first match wins.
#[must_use]
pub fn classify(utterance: &str) -> Option<Command> {
    let text = utterance.to_lowercase();
    let text = text.trim();

    if text.contains("time") {
        return Some(Command::Time);
    }
    if text.contains("date") || text.contains("today") {
        return Some(Command::Date);
    }
    if PROGRAM_LIST_QUERIES
        .iter()
        .any(|group| group.iter().all(|phrase| text.contains(phrase)))
    {
        return Some(Command::ListPrograms);
    }
    if contains_any(text, EMAIL_KEYWORDS) {
        return Some(Command::Email {
            open_client: text.contains("open"),
        });
    }
    if contains_any(text, SPREADSHEET_KEYWORDS) {
        return Some(Command::CreateSpreadsheet);
    }
    if contains_any(text, DOCUMENT_KEYWORDS) {
        return Some(classify_document(text));
    }
    if text.contains("open") {
        return classify_open(text);
    }
    None
}

fn classify_document(text: &str) -> Command {
    if contains_any(text, WORD_OPEN_PHRASES) {
        Command::OpenWordProcessor
    } else if contains_any(text, WORD_CREATE_PHRASES) {
        Command::CreateDocument
    } else if BARE_DOCUMENT_WORDS.contains(&text) {
        Command::OpenWordProcessor
    } else {
        Command::CreateDocument
    }
}

fn classify_open(text: &str) -> Option<Command> {
    if contains_any(text, OPEN_QUESTION_MARKERS) {
        return None;
    }

    match OPEN_TARGET.captures(text) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str()).trim();
            if contains_any(name, PROGRAM_NAME_STOPWORDS) {
                None
            } else {
                Some(Command::OpenProgram(name.to_string()))
            }
        }
        None => Some(Command::OpenTextEditor),
    }
}

/// Carry out a command
///
/// When the mail client was opened, an unreadable inbox only changes the
/// reply; otherwise the inbox error is returned.
///
/// # Errors
///
/// Returns error if a document cannot be created or the inbox cannot be read
pub fn execute(
    command: &Command,
    automation: &dyn Automation,
    now: NaiveDateTime,
) -> Result<CommandResult> {
    tracing::debug!(?command, "executing command");

    let result = match command {
        Command::Time => CommandResult::Say(format!(
            "The current time is {}",
            now.format("%I:%M %p")
        )),
        Command::Date => CommandResult::Say(format!("Today is {}", now.format("%A, %B %d, %Y"))),
        Command::ListPrograms => {
            CommandResult::Sequence(PROGRAM_HELP.iter().map(ToString::to_string).collect())
        }
        Command::Email { open_client: true } => {
            let opened = automation.open_application(automation.mail_client());
            match automation.list_inbox(INBOX_LIMIT) {
                Ok(emails) if !emails.is_empty() => {
                    let mut lines = vec![opened, "Here are your recent emails:".to_string()];
                    lines.extend(emails);
                    CommandResult::Sequence(lines)
                }
                result => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "could not read inbox");
                    }
                    CommandResult::Sequence(vec![
                        opened,
                        "Outlook opened, but couldn't retrieve emails at this time.".to_string(),
                    ])
                }
            }
        }
        Command::Email { open_client: false } => {
            CommandResult::Sequence(automation.list_inbox(INBOX_LIMIT)?)
        }
        Command::CreateSpreadsheet => {
            CommandResult::Say(automation.create_spreadsheet(Path::new(SPREADSHEET_FILE))?)
        }
        Command::OpenWordProcessor => CommandResult::Say(automation.open_application("word")),
        Command::CreateDocument => CommandResult::Say(
            automation.create_document(Path::new(DOCUMENT_FILE), DOCUMENT_TEXT)?,
        ),
        Command::OpenProgram(name) => CommandResult::Say(automation.open_application(name)),
        Command::OpenTextEditor => {
            CommandResult::Say(automation.open_application(automation.text_editor()))
        }
    };

    Ok(result)
}

/// Interpret an utterance at a fixed point in time
///
/// # Errors
///
/// Returns error if the matched command fails
pub fn interpret_at(
    utterance: &str,
    automation: &dyn Automation,
    now: NaiveDateTime,
) -> Result<Option<CommandResult>> {
    let Some(command) = classify(utterance) else {
        return Ok(None);
    };

    let result = execute(&command, automation, now)?;
    if result.is_empty() {
        // An empty inbox has nothing to report; let the language model answer
        tracing::debug!(?command, "command produced no replies");
        return Ok(None);
    }
    Ok(Some(result))
}

/// Interpret an utterance using the local clock
///
/// # Errors
///
/// Returns error if the matched command fails
pub fn interpret(utterance: &str, automation: &dyn Automation) -> Result<Option<CommandResult>> {
    interpret_at(utterance, automation, Local::now().naive_local())
}
