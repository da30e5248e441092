//! Conversation state machine
//!
//! [`Runner::step`] performs one listen/respond cycle for the current
//! [`SessionState`]. Every call blocks on capture, transcription, synthesis or
//! the language model; [`super::Agent`] drives it from a worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::dispatcher::CommandDispatcher;
use super::events::{Emitter, EventSink, Speaker};
use super::names::extract_name;
use super::session::{SessionState, SessionStatus, StateKind};
use super::{AgentConfig, Collaborators};
use crate::memory::UserMemory;
use crate::voice::{CapturePolicy, Recorder, SpeakOutcome, SpeechOutput, Transcriber};

/// Flags shared between the worker and its controller
#[derive(Debug)]
pub(crate) struct Control {
    running: AtomicBool,
    paused: AtomicBool,
    state: Mutex<StateKind>,
}

impl Control {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            state: Mutex::new(StateKind::Greeting),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    fn set_state(&self, kind: StateKind) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = kind;
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus {
            state: *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            paused: self.is_paused(),
            running: self.is_running(),
        }
    }
}

/// Speech output shared by the worker and the controller
#[derive(Clone)]
pub(crate) struct Voice {
    speech: Arc<Mutex<SpeechOutput>>,
    events: Emitter,
}

impl Voice {
    /// Speak `text` and record it in the transcript
    pub(crate) fn say(&self, text: &str) -> SpeakOutcome {
        if text.trim().is_empty() {
            return SpeakOutcome::skipped();
        }

        self.events.transcript(Speaker::Agent, text);
        let outcome = self
            .speech
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .speak(text);

        for failure in &outcome.failures {
            self.events.log(format!(
                "{} speech engine '{}' failed: {}",
                failure.tier, failure.engine, failure.error
            ));
        }
        outcome
    }

    pub(crate) fn release(&self) {
        self.speech
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release();
    }
}

pub(crate) fn welcome_back(name: &str, assistant: &str) -> String {
    format!("Welcome back, {name}! {assistant} is ready. Say '{assistant}' to activate me.")
}

pub(crate) fn welcome(assistant: &str) -> String {
    format!("Welcome to {assistant}! {assistant} is ready. Say '{assistant}' to activate me.")
}

pub(crate) fn going_to_sleep(assistant: &str) -> String {
    format!("Going to sleep. Say 'Wake up, {assistant}' to wake me.")
}

pub(crate) fn nice_to_meet(name: &str) -> String {
    format!("Nice to meet you, {name}! I'll remember you. What can I help you with?")
}

const ASK_NAME: &str = "Hello! Who are you?";
const LISTENING: &str = "Yes, I'm listening.";
const AWAKE: &str = "I'm awake.";
const NAME_NOT_CAUGHT: &str = "Sorry, I didn't catch your name. Could you tell me again?";

/// The agent's conversation loop
pub struct Runner {
    config: AgentConfig,
    recorder: Box<dyn Recorder>,
    transcriber: Box<dyn Transcriber>,
    dispatcher: CommandDispatcher,
    memory: Arc<Mutex<UserMemory>>,
    control: Arc<Control>,
    voice: Voice,
    events: Emitter,
    state: SessionState,
}

impl Runner {
    /// Create a runner in the [`SessionState::Greeting`] state
    #[must_use]
    pub fn new(
        config: AgentConfig,
        collaborators: Collaborators,
        memory: UserMemory,
        sink: EventSink,
    ) -> Self {
        let events = Emitter::new(sink);
        let Collaborators {
            recorder,
            transcriber,
            speech,
            automation,
            llm,
        } = collaborators;

        Self {
            config,
            recorder,
            transcriber,
            dispatcher: CommandDispatcher::new(automation, llm),
            memory: Arc::new(Mutex::new(memory)),
            control: Arc::new(Control::new()),
            voice: Voice {
                speech: Arc::new(Mutex::new(speech)),
                events: events.clone(),
            },
            events,
            state: SessionState::Greeting,
        }
    }

    pub(crate) fn control(&self) -> Arc<Control> {
        Arc::clone(&self.control)
    }

    pub(crate) fn voice(&self) -> Voice {
        self.voice.clone()
    }

    pub(crate) fn memory(&self) -> Arc<Mutex<UserMemory>> {
        Arc::clone(&self.memory)
    }

    pub(crate) fn emitter(&self) -> Emitter {
        self.events.clone()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.control.status()
    }

    /// Suspend or resume listening without announcing it
    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    /// Name of the remembered user
    #[must_use]
    pub fn user_name(&self) -> Option<String> {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user_name()
            .map(ToString::to_string)
    }

    /// Run until the controller clears the running flag, then release
    /// capture and transcription resources
    pub(crate) fn run(mut self) {
        tracing::info!(assistant = %self.config.assistant_name, "agent loop started");
        while self.control.is_running() {
            self.step();
        }
        self.release();
        tracing::info!("agent loop finished");
    }

    /// Perform one cycle for the current state
    pub fn step(&mut self) {
        if self.control.is_paused() {
            std::thread::sleep(self.config.timing.pause_poll);
            return;
        }

        match self.state {
            SessionState::Greeting => self.greet(),
            SessionState::WaitingForWake => self.listen_for_wake(),
            SessionState::Sleeping => self.listen_while_sleeping(),
            SessionState::Introducing => self.listen_for_name(),
            SessionState::Conversing { since } => self.converse(since),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        let changed = state.kind() != self.state.kind();
        self.state = state;
        self.control.set_state(state.kind());
        if changed {
            self.events.status(self.control.status());
        }
    }

    fn greet(&mut self) {
        let assistant = self.config.assistant_name.clone();
        let greeting = {
            let mut memory = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
            match memory.user_name().map(ToString::to_string) {
                Some(name) => {
                    if let Err(e) = memory.update_last_seen() {
                        tracing::warn!(error = %e, "failed to update last seen");
                    }
                    welcome_back(&name, &assistant)
                }
                None => welcome(&assistant),
            }
        };

        self.voice.say(&greeting);
        self.set_state(SessionState::WaitingForWake);
    }

    /// Record and transcribe one utterance
    fn hear(&mut self, policy: CapturePolicy) -> crate::Result<String> {
        let audio = self.recorder.record(policy)?;
        let text = self.transcriber.transcribe(&audio)?;
        let text = text.trim().to_string();
        if !text.is_empty() {
            self.events.transcript(Speaker::User, &text);
        }
        Ok(text)
    }

    fn capture_failed(&self, error: &crate::Error) {
        self.events.log(format!("Listening failed: {error}"));
        std::thread::sleep(self.config.timing.error_backoff);
    }

    fn mentions_wake_word(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.config.wake_word)
    }

    fn listen_for_wake(&mut self) {
        let text = match self.hear(CapturePolicy::Fixed(self.config.wake_listen)) {
            Ok(text) => text,
            Err(e) => return self.capture_failed(&e),
        };
        if text.is_empty() || !self.mentions_wake_word(&text) {
            return;
        }

        tracing::info!(wake_word = %self.config.wake_word, "wake word detected");
        if self.user_name().is_some() {
            self.voice.say(LISTENING);
            self.set_state(SessionState::conversing());
        } else {
            self.voice.say(ASK_NAME);
            self.set_state(SessionState::Introducing);
        }
    }

    fn listen_while_sleeping(&mut self) {
        let text = match self.hear(CapturePolicy::Fixed(self.config.wake_listen)) {
            Ok(text) => text,
            Err(e) => return self.capture_failed(&e),
        };

        if text.to_lowercase().contains("wake up") && self.mentions_wake_word(&text) {
            self.voice.say(AWAKE);
            self.set_state(SessionState::WaitingForWake);
        }
    }

    fn listen_for_name(&mut self) {
        let text = match self.hear(CapturePolicy::Fixed(self.config.introduction_listen)) {
            Ok(text) => text,
            Err(e) => return self.capture_failed(&e),
        };
        if text.is_empty() {
            self.set_state(SessionState::WaitingForWake);
            return;
        }

        match extract_name(&text, &self.config.wake_word) {
            Some(name) => {
                let stored = self
                    .memory
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_user_name(&name);
                if let Err(e) = stored {
                    tracing::warn!(error = %e, "failed to persist user name");
                }
                self.voice.say(&nice_to_meet(&name));
                self.set_state(SessionState::conversing());
            }
            None => {
                self.voice.say(NAME_NOT_CAUGHT);
            }
        }
    }

    fn converse(&mut self, since: Instant) {
        let policy = CapturePolicy::UntilSilence {
            max: self.config.max_utterance,
        };
        let text = match self.hear(policy) {
            Ok(text) => text,
            Err(e) => {
                self.capture_failed(&e);
                if since.elapsed() >= self.config.timing.conversation_timeout {
                    self.events.log("Conversation timed out");
                    self.set_state(SessionState::WaitingForWake);
                }
                return;
            }
        };

        if text.is_empty() {
            self.set_state(SessionState::WaitingForWake);
            return;
        }

        if text.to_lowercase().contains("sleep") {
            self.voice.say(&going_to_sleep(&self.config.assistant_name));
            self.set_state(SessionState::Sleeping);
            return;
        }

        let name = self.user_name();
        for reply in self.dispatcher.handle(&text, name.as_deref()) {
            self.voice.say(&reply);
        }
        self.set_state(SessionState::conversing());
    }

    fn release(&mut self) {
        if let Err(e) = self.recorder.release() {
            tracing::warn!(error = %e, "failed to release recorder");
        }
        if let Err(e) = self.transcriber.release() {
            tracing::warn!(error = %e, "failed to release transcriber");
        }
    }
}
