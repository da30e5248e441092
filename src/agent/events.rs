//! Events emitted by the agent worker

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use super::session::SessionStatus;

/// Who produced a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
    System,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One line of the conversation transcript (not persisted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl TranscriptLine {
    /// Create a line stamped with the current time
    #[must_use]
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

/// Notification from the agent to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Diagnostic message
    Log(String),
    /// Session state changed
    Status(SessionStatus),
    /// Something was said
    Transcript(TranscriptLine),
}

/// Callback receiving agent events
///
/// Runs synchronously on the emitting thread, so it must return quickly.
pub type EventSink = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

/// Traces events and forwards them to the sink
#[derive(Clone)]
pub(crate) struct Emitter {
    sink: EventSink,
}

impl Emitter {
    pub(crate) fn new(sink: EventSink) -> Self {
        Self { sink }
    }

    pub(crate) fn log(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "agent log");
        (self.sink)(&AgentEvent::Log(message));
    }

    pub(crate) fn status(&self, status: SessionStatus) {
        tracing::debug!(state = %status.state, paused = status.paused, running = status.running, "agent status");
        (self.sink)(&AgentEvent::Status(status));
    }

    pub(crate) fn transcript(&self, speaker: Speaker, text: &str) {
        tracing::info!(%speaker, text, "transcript");
        (self.sink)(&AgentEvent::Transcript(TranscriptLine::new(speaker, text)));
    }
}
