//! Voice agent orchestration
//!
//! [`Agent`] owns one worker thread that runs the conversation
//! [`Runner`]. The controlling thread talks to it only through shared flags,
//! the shared speech output and the [`EventSink`].

mod dispatcher;
mod events;
mod names;
mod runner;
mod session;

use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

pub use dispatcher::{APOLOGY, CommandDispatcher};
pub use events::{AgentEvent, EventSink, Speaker, TranscriptLine};
pub use names::extract_name;
pub use runner::Runner;
pub use session::{SessionState, SessionStatus, StateKind};

use crate::automation::Automation;
use crate::config::{AgentSettings, Settings};
use crate::llm::LanguageModel;
use crate::memory::UserMemory;
use crate::voice::{Recorder, SpeechOutput, Transcriber};
use crate::{Error, Result};
use events::Emitter;
use runner::{Control, Voice};

/// Behavior settings for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name used in spoken phrases
    pub assistant_name: String,
    /// Lowercase trigger token
    pub wake_word: String,
    /// Capture length while waiting for the wake word or sleeping
    pub wake_listen: Duration,
    /// Capture length for the introduction reply
    pub introduction_listen: Duration,
    /// Upper bound for a conversational utterance
    pub max_utterance: Duration,
    /// Loop timing
    pub timing: AgentSettings,
}

impl AgentConfig {
    /// Agent settings for `assistant`, with default timing
    #[must_use]
    pub fn new(assistant: impl Into<String>) -> Self {
        let assistant_name = assistant.into();
        Self {
            wake_word: assistant_name.to_lowercase(),
            assistant_name,
            wake_listen: Duration::from_secs(3),
            introduction_listen: Duration::from_secs(5),
            max_utterance: Duration::from_secs(10),
            timing: AgentSettings::default(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            assistant_name: settings.assistant.name.clone(),
            wake_word: settings.assistant.wake_word.clone(),
            wake_listen: settings.audio.wake_listen,
            introduction_listen: settings.audio.command_listen,
            max_utterance: settings.audio.max_utterance,
            timing: settings.agent.clone(),
        }
    }
}

/// Everything the agent listens, speaks and acts through
pub struct Collaborators {
    pub recorder: Box<dyn Recorder>,
    pub transcriber: Box<dyn Transcriber>,
    pub speech: SpeechOutput,
    pub automation: Box<dyn Automation>,
    pub llm: Box<dyn LanguageModel>,
}

/// Handle to the background voice agent
pub struct Agent {
    config: AgentConfig,
    control: Arc<Control>,
    voice: Voice,
    memory: Arc<Mutex<UserMemory>>,
    events: Emitter,
    runner: Option<Runner>,
    worker: Option<JoinHandle<()>>,
    done: Option<mpsc::Receiver<()>>,
}

impl Agent {
    /// Create a stopped agent
    #[must_use]
    pub fn new(
        config: AgentConfig,
        collaborators: Collaborators,
        memory: UserMemory,
        sink: EventSink,
    ) -> Self {
        let runner = Runner::new(config.clone(), collaborators, memory, sink);

        Self {
            config,
            control: runner.control(),
            voice: runner.voice(),
            memory: runner.memory(),
            events: runner.emitter(),
            runner: Some(runner),
            worker: None,
            done: None,
        }
    }

    /// Start the worker thread
    ///
    /// # Errors
    ///
    /// Returns error if the agent was already started or the thread cannot
    /// be spawned
    pub fn start(&mut self) -> Result<()> {
        let runner = self
            .runner
            .take()
            .ok_or_else(|| Error::Agent("agent has already been started".to_string()))?;

        self.control.set_running(true);
        self.control.set_paused(false);

        let (done_tx, done_rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("gaia-agent".to_string())
            .spawn(move || {
                runner.run();
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.done = Some(done_rx);
                self.events.log(format!("{} started", self.config.assistant_name));
                self.events.status(self.control.status());
                Ok(())
            }
            Err(e) => {
                self.control.set_running(false);
                Err(Error::Agent(format!("failed to spawn agent thread: {e}")))
            }
        }
    }

    /// Stop the worker, say goodbye and release speech resources
    ///
    /// Waits up to the configured join timeout for the worker to finish its
    /// current cycle; an in-flight capture is not interrupted.
    pub fn stop(&mut self) {
        if !self.control.is_running() {
            return;
        }
        self.control.set_running(false);

        let goodbye = self
            .memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user_name()
            .map_or_else(
                || "Shutting down. Goodbye.".to_string(),
                |name| format!("Goodbye, {name}!"),
            );
        self.voice.say(&goodbye);
        self.events.transcript(Speaker::System, "Agent stopped");
        self.voice.release();

        let joined = self
            .done
            .take()
            .is_none_or(|done| match done.recv_timeout(self.config.timing.join_timeout) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => true,
                Err(mpsc::RecvTimeoutError::Timeout) => false,
            });

        if let Some(handle) = self.worker.take() {
            if joined {
                if handle.join().is_err() {
                    tracing::error!("agent thread panicked");
                }
            } else {
                tracing::warn!(
                    timeout = ?self.config.timing.join_timeout,
                    "agent thread did not stop in time"
                );
            }
        }
        self.events.status(self.control.status());
    }

    /// Suspend listening
    pub fn pause(&self) {
        self.control.set_paused(true);
        self.events.transcript(Speaker::System, "Agent paused");
        self.voice
            .say(&format!("{} is paused.", self.config.assistant_name));
        self.events.status(self.control.status());
    }

    /// Resume listening
    pub fn resume(&self) {
        self.control.set_paused(false);
        self.events.transcript(Speaker::System, "Agent resumed");
        self.voice
            .say(&format!("{} is active again.", self.config.assistant_name));
        self.events.status(self.control.status());
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.control.status()
    }

    /// Whether the worker is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.stop();
    }
}
