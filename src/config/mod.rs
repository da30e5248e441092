//! Configuration management for Gaia

mod store;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

pub use store::{ConfigStore, default_config};

/// Typed view of the configuration store
///
/// Built once at startup; secrets and endpoints can be overridden from the
/// environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Assistant identity
    pub assistant: AssistantSettings,

    /// Azure Speech (primary TTS)
    pub azure: AzureSettings,

    /// Local language model
    pub llm: LlmSettings,

    /// Speech-to-text service
    pub stt: SttSettings,

    /// Microphone capture
    pub audio: AudioSettings,

    /// Agent loop timing
    pub agent: AgentSettings,

    /// Local (fallback) TTS
    pub local_tts: LocalTtsSettings,

    /// Desktop automation
    pub automation: AutomationSettings,

    /// IMAP inbox
    pub email: EmailSettings,
}

/// Assistant identity
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Display name used in spoken phrases (e.g. "Gaia")
    pub name: String,

    /// Trigger token, lowercase
    pub wake_word: String,
}

/// Azure Speech configuration
#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// Subscription key (from `AZURE_SPEECH_KEY` or `azure.key`)
    pub key: Option<SecretString>,

    /// Azure region (e.g. "eastus")
    pub region: String,

    /// Neural voice name (e.g. "en-US-AriaNeural")
    pub voice: String,
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Ollama base URL
    pub host: String,

    /// Model identifier (e.g. "llama3")
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SttSettings {
    /// OpenAI-compatible transcription endpoint
    pub url: String,

    /// Whisper model name
    pub model: String,

    /// Optional bearer token
    pub api_key: Option<SecretString>,
}

/// Microphone capture configuration
#[derive(Debug, Clone)]
pub struct AudioSettings {
    /// Input device name; default device when `None`
    pub input_device: Option<String>,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Fixed capture length while waiting for the wake word or sleeping
    pub wake_listen: Duration,

    /// Fixed capture length for the introduction reply
    pub command_listen: Duration,

    /// Upper bound for voice-activity terminated captures
    pub max_utterance: Duration,
}

/// Agent loop timing
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Inactivity window after which conversation mode ends
    pub conversation_timeout: Duration,

    /// Bounded wait for the worker thread on shutdown
    pub join_timeout: Duration,

    /// Idle wait while paused
    pub pause_poll: Duration,

    /// Back-off after a failed capture
    pub error_backoff: Duration,
}

/// Local TTS configuration
#[derive(Debug, Clone)]
pub struct LocalTtsSettings {
    /// Words per minute
    pub rate: u32,

    /// Volume, 0.0 to 1.0
    pub volume: f32,
}

/// Desktop automation configuration
#[derive(Debug, Clone)]
pub struct AutomationSettings {
    /// Directory where created documents are saved
    pub output_dir: PathBuf,

    /// Application opened for "open email" commands
    pub mail_client: String,

    /// Application opened for a bare "open" command
    pub text_editor: String,
}

/// IMAP inbox configuration
#[derive(Debug, Clone)]
pub struct EmailSettings {
    /// IMAP host; inbox access is disabled when `None`
    pub host: Option<String>,

    /// IMAP TLS port
    pub port: u16,

    /// Login name
    pub user: String,

    /// Password or app password (from `GAIA_IMAP_PASSWORD` or `email.password`)
    pub password: Option<SecretString>,

    /// Mailbox to read
    pub mailbox: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            conversation_timeout: Duration::from_secs(30),
            join_timeout: Duration::from_secs(5),
            pause_poll: Duration::from_millis(500),
            error_backoff: Duration::from_secs(1),
        }
    }
}

impl Settings {
    /// Build settings from the store, applying environment overrides
    #[must_use]
    pub fn from_store(store: &ConfigStore) -> Self {
        let env = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secret = |env_name: &str, key: &str| {
            env(env_name)
                .or_else(|| store.get_str(key))
                .map(SecretString::from)
        };

        let name = store
            .get_str("assistant.name")
            .unwrap_or_else(|| "Gaia".to_string());
        let wake_word = store
            .get_str("assistant.wake_word")
            .unwrap_or_else(|| name.clone())
            .to_lowercase();

        let defaults = AgentSettings::default();

        Self {
            assistant: AssistantSettings { name, wake_word },
            azure: AzureSettings {
                key: secret("AZURE_SPEECH_KEY", "azure.key"),
                region: env("AZURE_SPEECH_REGION")
                    .or_else(|| store.get_str("azure.region"))
                    .unwrap_or_else(|| "eastus".to_string()),
                voice: store
                    .get_str("azure.voice")
                    .unwrap_or_else(|| "en-US-AriaNeural".to_string()),
            },
            llm: LlmSettings {
                host: env("OLLAMA_HOST")
                    .or_else(|| store.get_str("llm.host"))
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                model: env("GAIA_LLM_MODEL")
                    .or_else(|| store.get_str("llm.model"))
                    .unwrap_or_else(|| "llama3".to_string()),
                temperature: store.get_or("llm.temperature", 0.7),
            },
            stt: SttSettings {
                url: store
                    .get_str("stt.url")
                    .unwrap_or_else(|| "http://localhost:8000/v1/audio/transcriptions".to_string()),
                model: store
                    .get_str("stt.model")
                    .unwrap_or_else(|| "base".to_string()),
                api_key: secret("GAIA_STT_API_KEY", "stt.api_key"),
            },
            audio: AudioSettings {
                input_device: store.get_str("audio.input_device"),
                sample_rate: store.get_or("audio.sample_rate", crate::voice::SAMPLE_RATE),
                wake_listen: Duration::from_secs(store.get_or("audio.wake_listen_secs", 3)),
                command_listen: Duration::from_secs(store.get_or("audio.command_listen_secs", 5)),
                max_utterance: Duration::from_secs(store.get_or("audio.max_utterance_secs", 10)),
            },
            agent: AgentSettings {
                conversation_timeout: Duration::from_secs(
                    store.get_or("agent.conversation_timeout_secs", 30),
                ),
                join_timeout: Duration::from_secs(store.get_or("agent.join_timeout_secs", 5)),
                ..defaults
            },
            local_tts: LocalTtsSettings {
                rate: store.get_or("local_tts.rate", 180),
                volume: store.get_or("local_tts.volume", 1.0_f32).clamp(0.0, 1.0),
            },
            automation: AutomationSettings {
                output_dir: store
                    .get_str("automation.output_dir")
                    .map_or_else(|| PathBuf::from("."), PathBuf::from),
                mail_client: store
                    .get_str("automation.mail_client")
                    .unwrap_or_else(|| "outlook".to_string()),
                text_editor: store
                    .get_str("automation.text_editor")
                    .unwrap_or_else(|| default_text_editor().to_string()),
            },
            email: EmailSettings {
                host: store.get_str("email.host"),
                port: store.get_or("email.port", 993),
                user: store.get_str("email.user").unwrap_or_default(),
                password: secret("GAIA_IMAP_PASSWORD", "email.password"),
                mailbox: store
                    .get_str("email.mailbox")
                    .unwrap_or_else(|| "INBOX".to_string()),
            },
        }
    }
}

/// Platform default plain text editor
#[must_use]
pub const fn default_text_editor() -> &'static str {
    if cfg!(target_os = "windows") {
        "notepad.exe"
    } else if cfg!(target_os = "macos") {
        "TextEdit"
    } else {
        "gedit"
    }
}

/// Default config file path: `~/.config/gaia/config.json`
///
/// `GAIA_CONFIG` overrides the location.
#[must_use]
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("GAIA_CONFIG") {
        return PathBuf::from(path);
    }
    directories::ProjectDirs::from("dev", "gaia", "gaia").map_or_else(
        || PathBuf::from("config.json"),
        |d| d.config_dir().join("config.json"),
    )
}

/// Default user memory path: `~/.local/share/gaia/user_memory.json`
#[must_use]
pub fn memory_file_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "gaia", "gaia").map_or_else(
        || PathBuf::from("user_memory.json"),
        |d| d.data_dir().join("user_memory.json"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn test_settings_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json")).unwrap();
        let settings = Settings::from_store(&store);

        assert_eq!(settings.assistant.name, "Gaia");
        assert_eq!(settings.assistant.wake_word, "gaia");
        assert_eq!(settings.audio.sample_rate, 16000);
        assert_eq!(settings.audio.wake_listen, Duration::from_secs(3));
        assert_eq!(settings.agent.conversation_timeout, Duration::from_secs(30));
        assert_eq!(settings.local_tts.rate, 180);
        assert!(settings.email.host.is_none());
    }

    #[test]
    fn test_settings_reflect_store_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config.json")).unwrap();
        store.set("assistant.name", json!("Nova")).unwrap();
        store.set("assistant.wake_word", json!("Hey Nova")).unwrap();
        store.set("stt.api_key", json!("sk-test")).unwrap();
        store.set("local_tts.volume", json!(3.5)).unwrap();

        let settings = Settings::from_store(&store);
        assert_eq!(settings.assistant.name, "Nova");
        assert_eq!(settings.assistant.wake_word, "hey nova");
        assert_eq!(
            settings.stt.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-test".to_string())
        );
        assert!((settings.local_tts.volume - 1.0).abs() < f32::EPSILON);
    }
}
