//! Console front ends: terminal chat and the voice console

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::{Arc, mpsc};

use crate::agent::{Agent, AgentEvent, CommandDispatcher, EventSink, Speaker};
use crate::automation::DesktopAutomation;
use crate::config::Settings;
use crate::llm::OllamaClient;
use crate::voice::{
    AzureSynthesizer, LocalSynthesizer, MicRecorder, SpeechOutput, Synthesizer,
    WhisperTranscriber,
};
use crate::{Result, agent};

const CHAT_HELP: &str = "\
Commands:
  help        Show this help
  config      Show the configuration file in use
  quit, exit  Leave the chat

Anything else is handled like a spoken command: try \"what time is it\",
\"create a new document\" or ask a question.";

const CONSOLE_HELP: &str = "Type 'pause', 'resume', 'status' or 'quit' (Ctrl-C also stops).";

/// What to do with one line typed into the terminal chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Quit,
    Help,
    ShowConfig,
    Skip,
    Ask(String),
}

/// Classify a line of terminal chat input
#[must_use]
pub fn chat_action(line: &str) -> ChatAction {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => ChatAction::Skip,
        "quit" | "exit" => ChatAction::Quit,
        "help" => ChatAction::Help,
        "config" => ChatAction::ShowConfig,
        _ => ChatAction::Ask(line.to_string()),
    }
}

/// Build the command dispatcher from settings
///
/// # Errors
///
/// Returns error if the language model is unreachable
pub fn build_dispatcher(settings: &Settings) -> Result<CommandDispatcher> {
    let llm = OllamaClient::connect(&settings.llm)?;
    let automation = DesktopAutomation::new(settings.automation.clone(), &settings.email);
    Ok(CommandDispatcher::new(Box::new(automation), Box::new(llm)))
}

/// Build the cloud plus local speech output
///
/// A missing local engine only disables the fallback tier.
///
/// # Errors
///
/// Returns error if the Azure engine cannot be configured
pub fn build_speech(settings: &Settings) -> Result<SpeechOutput> {
    let azure = AzureSynthesizer::new(
        settings.azure.key.clone(),
        &settings.azure.region,
        settings.azure.voice.clone(),
    )?;

    let local: Option<Box<dyn Synthesizer>> =
        match LocalSynthesizer::new(settings.local_tts.rate, settings.local_tts.volume) {
            Ok(local) => Some(Box::new(local)),
            Err(e) => {
                tracing::warn!(error = %e, "local TTS unavailable, running without fallback");
                None
            }
        };

    Ok(SpeechOutput::new(Some(Box::new(azure)), local))
}

/// Build every collaborator the voice agent needs
///
/// # Errors
///
/// Returns error if speech output, transcription or the language model
/// cannot be initialized
pub fn build_collaborators(settings: &Settings) -> Result<agent::Collaborators> {
    let speech = build_speech(settings)?;
    let transcriber = WhisperTranscriber::new(
        settings.stt.url.clone(),
        settings.stt.model.clone(),
        settings.stt.api_key.clone(),
    )?;
    let recorder = MicRecorder::new(settings.audio.input_device.clone(), settings.audio.sample_rate);
    let llm = OllamaClient::connect(&settings.llm)?;
    let automation = DesktopAutomation::new(settings.automation.clone(), &settings.email);

    Ok(agent::Collaborators {
        recorder: Box::new(recorder),
        transcriber: Box::new(transcriber),
        speech,
        automation: Box::new(automation),
        llm: Box::new(llm),
    })
}

/// Run the terminal chat until `quit` or end of input
///
/// # Errors
///
/// Returns error if reading input or writing output fails
pub fn run_terminal_chat<R: BufRead>(
    input: R,
    dispatcher: &mut CommandDispatcher,
    output: &mut dyn Synthesizer,
    user_name: Option<&str>,
    config_path: &Path,
) -> Result<()> {
    println!("Type 'help' for commands, 'quit' to exit");
    prompt()?;

    for line in input.lines() {
        match chat_action(&line?) {
            ChatAction::Quit => break,
            ChatAction::Help => println!("{CHAT_HELP}"),
            ChatAction::ShowConfig => println!("Current config file: {}", config_path.display()),
            ChatAction::Skip => {}
            ChatAction::Ask(question) => {
                for reply in dispatcher.handle(&question, user_name) {
                    if let Err(e) = output.speak(&reply) {
                        tracing::warn!(error = %e, "failed to print reply");
                    }
                }
            }
        }
        prompt()?;
    }

    println!("Goodbye!");
    Ok(())
}

fn prompt() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "You: ")?;
    stdout.flush()?;
    Ok(())
}

/// Event sink that prints agent events to stdout
#[must_use]
pub fn console_sink(assistant: &str) -> EventSink {
    let assistant = assistant.to_string();
    Arc::new(move |event: &AgentEvent| match event {
        AgentEvent::Log(message) => println!("[log] {message}"),
        AgentEvent::Status(status) => println!("[status] {status}"),
        AgentEvent::Transcript(line) => {
            let who = match line.speaker {
                Speaker::User => "You",
                Speaker::Agent => assistant.as_str(),
                Speaker::System => "System",
            };
            println!("[{}] {who}: {}", line.timestamp.format("%H:%M:%S"), line.text);
        }
    })
}

/// Input arriving at the voice console
enum ConsoleInput {
    Line(String),
    Interrupt,
    Closed,
}

/// Run the voice console: start the agent and take typed controls
///
/// # Errors
///
/// Returns error if the agent cannot be started
pub fn run_voice_console(agent: &mut Agent) -> Result<()> {
    agent.start()?;
    println!("{CONSOLE_HELP}");

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone());
    spawn_interrupt_listener(tx);

    while let Ok(input) = rx.recv() {
        match input {
            ConsoleInput::Line(line) => match line.trim().to_lowercase().as_str() {
                "" => {}
                "pause" => agent.pause(),
                "resume" => agent.resume(),
                "status" => println!("Status: {}", agent.status()),
                "quit" | "exit" | "stop" => break,
                other => println!("Unknown command: {other}. {CONSOLE_HELP}"),
            },
            ConsoleInput::Interrupt => {
                println!();
                tracing::info!("interrupted, stopping agent");
                break;
            }
            ConsoleInput::Closed => break,
        }
    }

    agent.stop();
    Ok(())
}

fn spawn_stdin_reader(tx: mpsc::Sender<ConsoleInput>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(ConsoleInput::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(ConsoleInput::Closed);
    });
}

/// Forward Ctrl-C to the console
///
/// Uses a private single-threaded runtime so the blocking HTTP clients never
/// run inside an async context.
fn spawn_interrupt_listener(tx: mpsc::Sender<ConsoleInput>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "Ctrl-C handling unavailable");
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            let _ = tx.send(ConsoleInput::Interrupt);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_actions() {
        assert_eq!(chat_action("  QUIT "), ChatAction::Quit);
        assert_eq!(chat_action("exit"), ChatAction::Quit);
        assert_eq!(chat_action("help"), ChatAction::Help);
        assert_eq!(chat_action("config"), ChatAction::ShowConfig);
        assert_eq!(chat_action("   "), ChatAction::Skip);
        assert_eq!(
            chat_action(" What time is it? "),
            ChatAction::Ask("What time is it?".to_string())
        );
    }
}
