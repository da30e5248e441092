//! Gaia - desktop voice assistant
//!
//! This library provides the pieces of the Gaia assistant:
//! - Voice processing (capture, end-of-speech detection, STT, tiered TTS)
//! - A rule-based command interpreter with office automation
//! - A local language model fallback via Ollama
//! - The conversational agent (wake word, introduction, sleep, commands)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Console shell                       │
//! │      Menu  │  Voice console  │  Terminal chat        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Agent                             │
//! │  Session state  │  Dispatcher  │  Events  │  Memory │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               Collaborators                          │
//! │  Mic + STT  │  Azure/local TTS  │  Ollama  │ Desktop │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod automation;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod llm;
pub mod memory;
pub mod shell;
pub mod voice;

pub use agent::{Agent, AgentConfig, AgentEvent, Collaborators, CommandDispatcher, EventSink};
pub use config::{ConfigStore, Settings};
pub use error::{Error, Result};
pub use interpreter::{Command, CommandResult};
pub use memory::{UserMemory, UserProfile};
