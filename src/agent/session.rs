//! Conversational session state

use std::fmt;
use std::time::Instant;

/// Where the agent is in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// About to greet the user
    Greeting,
    /// Listening for the wake word
    WaitingForWake,
    /// Only "wake up" plus the wake word is acted on
    Sleeping,
    /// Waiting for a first-time user to say their name
    Introducing,
    /// Taking commands; `since` is the last successful command
    Conversing { since: Instant },
}

impl SessionState {
    /// Start a conversation now
    #[must_use]
    pub fn conversing() -> Self {
        Self::Conversing {
            since: Instant::now(),
        }
    }

    /// Variant without its data
    #[must_use]
    pub const fn kind(&self) -> StateKind {
        match self {
            Self::Greeting => StateKind::Greeting,
            Self::WaitingForWake => StateKind::WaitingForWake,
            Self::Sleeping => StateKind::Sleeping,
            Self::Introducing => StateKind::Introducing,
            Self::Conversing { .. } => StateKind::Conversing,
        }
    }
}

/// [`SessionState`] without timing data, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Greeting,
    WaitingForWake,
    Sleeping,
    Introducing,
    Conversing,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Greeting => "greeting",
            Self::WaitingForWake => "waiting for wake word",
            Self::Sleeping => "sleeping",
            Self::Introducing => "introducing",
            Self::Conversing => "conversing",
        };
        f.write_str(label)
    }
}

/// Snapshot reported by [`super::Agent::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: StateKind,
    pub paused: bool,
    pub running: bool,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.running {
            write!(f, "stopped")
        } else if self.paused {
            write!(f, "paused ({})", self.state)
        } else {
            write!(f, "{}", self.state)
        }
    }
}
