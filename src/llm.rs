//! Local language model client (Ollama)

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::LlmSettings;
use crate::{Error, Result};

/// Answers free-form prompts
pub trait LanguageModel: Send {
    /// Send a single prompt and return the model's reply
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or replies with an error
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Blocking client for the Ollama chat API
///
/// Requests carry no timeout; a slow model simply blocks the worker.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    chat_url: Url,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    /// Create a client without contacting the server
    ///
    /// # Errors
    ///
    /// Returns error if the host is not a valid URL
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let base = Url::parse(&settings.host)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()?;

        Ok(Self {
            client,
            chat_url: base.join("/api/chat")?,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    /// Create a client and verify the server answers
    ///
    /// # Errors
    ///
    /// Returns [`Error::Llm`] if the server cannot be reached
    pub fn connect(settings: &LlmSettings) -> Result<Self> {
        let client = Self::new(settings)?;
        let version = client.probe().map_err(|e| {
            Error::Llm(format!(
                "Ollama is not available at {}: {e}. Start it with `ollama serve`",
                settings.host
            ))
        })?;
        tracing::info!(host = %settings.host, model = %client.model, version, "connected to Ollama");
        Ok(client)
    }

    /// Query the server version
    fn probe(&self) -> Result<String> {
        let url = self.chat_url.join("/api/version")?;
        let response = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_secs(5))
            .send()?
            .error_for_status()?;
        let body: VersionResponse = response.json()?;
        Ok(body.version)
    }

    /// Model name in use
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for OllamaClient {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending chat request");

        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&request)
            .send()
            .inspect_err(|e| tracing::error!(error = %e, "Ollama request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Llm(format!("Ollama error {status}: {body}")));
        }

        let reply: ChatResponse = response.json()?;
        tracing::debug!(reply_len = reply.message.content.len(), "chat reply received");
        Ok(reply.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(host: &str) -> LlmSettings {
        LlmSettings {
            host: host.to_string(),
            model: "llama3".to_string(),
            temperature: 0.7,
        }
    }

    #[test]
    fn test_chat_url_from_host() {
        let client = OllamaClient::new(&settings("http://localhost:11434")).unwrap();
        assert_eq!(client.chat_url.as_str(), "http://localhost:11434/api/chat");
        assert_eq!(client.model(), "llama3");
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(OllamaClient::new(&settings("not a url")).is_err());
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "llama3",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            stream: false,
            options: ChatOptions { temperature: 0.5 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.5);
    }
}
