//! Speech-to-text (STT) processing

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Converts a recorded audio file to text
pub trait Transcriber: Send {
    /// Transcribe the WAV file at `audio_file`
    ///
    /// An empty string means nothing intelligible was heard.
    ///
    /// # Errors
    ///
    /// Returns error if the transcription backend fails
    fn transcribe(&mut self, audio_file: &Path) -> Result<String>;

    /// Release any held model resources
    ///
    /// # Errors
    ///
    /// Returns error if cleanup fails
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Response from an OpenAI-compatible transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes speech through a Whisper-compatible HTTP endpoint
///
/// Works with the `OpenAI` API as well as local servers that mirror it
/// (faster-whisper-server, whisper.cpp server).
pub struct WhisperTranscriber {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl WhisperTranscriber {
    /// Create a transcriber for `url` using `model`
    ///
    /// # Errors
    ///
    /// Returns error if the URL is empty
    pub fn new(url: String, model: String, api_key: Option<SecretString>) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::Config("STT endpoint URL required".to_string()));
        }

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            url,
            model,
            api_key,
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&mut self, audio_file: &Path) -> Result<String> {
        if !audio_file.exists() {
            tracing::warn!(path = %audio_file.display(), "audio file not found");
            return Ok(String::new());
        }

        let audio = std::fs::read(audio_file)?;
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::blocking::multipart::Form::new()
            .part(
                "file",
                reqwest::blocking::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().inspect_err(|e| {
            tracing::error!(error = %e, "Whisper request failed");
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().inspect_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
        })?;

        let text = result.text.trim().to_string();
        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}
