//! Error types for Gaia

use thiserror::Error;

/// Result type alias for Gaia operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Gaia
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Application launch or document creation error
    #[error("automation error: {0}")]
    Automation(String),

    /// Mailbox access error
    #[error("email error: {0}")]
    Email(String),

    /// Agent lifecycle error
    #[error("agent error: {0}")]
    Agent(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Zip archive error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// URL parsing error
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
}
