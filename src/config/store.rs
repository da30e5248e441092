//! JSON configuration store
//!
//! Settings live in a single JSON object addressed by dotted keys
//! (`azure.region`, `audio.sample_rate`). The file is created with defaults
//! the first time it is opened and rewritten in full on every `set`.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::{Error, Result};

/// Flat-file configuration store with dotted-path access
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    data: Value,
}

impl ConfigStore {
    /// Open the store at `path`, creating it with defaults if absent
    ///
    /// A file that exists but cannot be parsed is left untouched and the
    /// defaults are used in memory.
    ///
    /// # Errors
    ///
    /// Returns error if a missing file cannot be created
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                path,
                data: default_config(),
            };
            store.save()?;
            tracing::info!(path = %store.path.display(), "created default config file");
            return Ok(store);
        }

        let data = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(value) if value.is_object() => {
                    tracing::info!(path = %path.display(), "loaded config file");
                    value
                }
                Ok(_) => {
                    tracing::warn!(
                        path = %path.display(),
                        "config file is not a JSON object, using defaults"
                    );
                    default_config()
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse config file, using defaults"
                    );
                    default_config()
                }
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read config file, using defaults"
                );
                default_config()
            }
        };

        Ok(Self { path, data })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a value by dotted key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.data, |current, part| current.get(part))
    }

    /// Look up a value by dotted key and deserialize it, falling back to `default`
    ///
    /// `null` and values of the wrong shape also yield `default`.
    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(default)
    }

    /// Look up a string value, treating empty strings as absent
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }

    /// Set a value by dotted key and persist the whole file
    ///
    /// Missing intermediate objects are created; a scalar sitting on the
    /// path is replaced by an object.
    ///
    /// # Errors
    ///
    /// Returns error if the key is empty or the file cannot be written
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return Err(Error::Config("empty config key".to_string()));
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::Config(format!("invalid config key: {key:?}")));
        }

        let mut current = &mut self.data;
        for part in parents {
            current = ensure_object(current)
                .entry((*part).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(current).insert((*last).to_string(), value);

        tracing::debug!(key, "config value set");
        self.save()
    }

    /// Write the store to disk
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Coerce `value` into an object, replacing whatever was there
fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Default configuration written on first run
#[must_use]
pub fn default_config() -> Value {
    json!({
        "assistant": {
            "name": "Gaia",
            "wake_word": "gaia"
        },
        "azure": {
            "key": "",
            "region": "eastus",
            "voice": "en-US-AriaNeural"
        },
        "llm": {
            "host": "http://localhost:11434",
            "model": "llama3",
            "temperature": 0.7
        },
        "stt": {
            "url": "http://localhost:8000/v1/audio/transcriptions",
            "model": "base",
            "api_key": ""
        },
        "audio": {
            "input_device": null,
            "sample_rate": 16000,
            "wake_listen_secs": 3,
            "command_listen_secs": 5,
            "max_utterance_secs": 10
        },
        "agent": {
            "conversation_timeout_secs": 30,
            "join_timeout_secs": 5
        },
        "local_tts": {
            "rate": 180,
            "volume": 1.0
        },
        "automation": {
            "output_dir": ".",
            "mail_client": "outlook",
            "text_editor": null
        },
        "email": {
            "host": "",
            "port": 993,
            "user": "",
            "password": "",
            "mailbox": "INBOX"
        },
        "gui": {
            "theme": "dark",
            "window_size": [1000, 700]
        }
    })
}
