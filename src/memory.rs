//! Persistent user memory
//!
//! A single `{name, last_seen}` record stored as JSON and rewritten on every
//! mutation.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Timestamp format used in the memory file
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The remembered user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Name given during the first-run introduction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// When the user was last greeted
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp_format"
    )]
    pub last_seen: Option<NaiveDateTime>,
}

/// JSON-backed store for the single user profile
#[derive(Debug)]
pub struct UserMemory {
    path: PathBuf,
    profile: UserProfile,
}

impl UserMemory {
    /// Load memory from `path`
    ///
    /// A missing or unreadable file yields an empty profile.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let profile = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "corrupt user memory, starting fresh");
                UserProfile::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UserProfile::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read user memory");
                UserProfile::default()
            }
        };

        Self { path, profile }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current profile
    #[must_use]
    pub const fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Stored user name
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.profile.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Whether a user has introduced themselves
    #[must_use]
    pub fn is_user_known(&self) -> bool {
        self.user_name().is_some()
    }

    /// Last greeting timestamp
    #[must_use]
    pub const fn last_seen(&self) -> Option<NaiveDateTime> {
        self.profile.last_seen
    }

    /// Store the user's name and stamp `last_seen`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn set_user_name(&mut self, name: &str) -> Result<()> {
        self.profile.name = Some(name.to_string());
        self.profile.last_seen = Some(now());
        tracing::info!(name, "user name stored");
        self.save()
    }

    /// Stamp `last_seen` with the current local time
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn update_last_seen(&mut self) -> Result<()> {
        self.profile.last_seen = Some(now());
        self.save()
    }

    /// Forget the user entirely
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn clear(&mut self) -> Result<()> {
        self.profile = UserProfile::default();
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.profile)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Current local time truncated to whole seconds
fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        // Unparseable timestamps are dropped rather than failing the whole record
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_memory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let memory = UserMemory::load(dir.path().join("user_memory.json"));

        assert!(!memory.is_user_known());
        assert!(memory.last_seen().is_none());
    }

    #[test]
    fn test_set_name_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_memory.json");

        let mut memory = UserMemory::load(&path);
        memory.set_user_name("Sam").unwrap();

        let reloaded = UserMemory::load(&path);
        assert_eq!(reloaded.user_name(), Some("Sam"));
        assert!(reloaded.last_seen().is_some());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let stamp = raw["last_seen"].as_str().unwrap();
        assert!(NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_reads_existing_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_memory.json");
        std::fs::write(
            &path,
            r#"{"name": "Luke", "last_seen": "2024-01-15 14:30:00"}"#,
        )
        .unwrap();

        let memory = UserMemory::load(&path);
        assert_eq!(memory.user_name(), Some("Luke"));
        assert_eq!(
            memory.last_seen().map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            Some("2024-01-15 14:30:00".to_string())
        );
    }

    #[test]
    fn test_empty_name_counts_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_memory.json");
        std::fs::write(&path, r#"{"name": ""}"#).unwrap();

        assert!(!UserMemory::load(&path).is_user_known());
    }

    #[test]
    fn test_clear_forgets_user() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_memory.json");

        let mut memory = UserMemory::load(&path);
        memory.set_user_name("Maria").unwrap();
        memory.clear().unwrap();

        assert!(!UserMemory::load(&path).is_user_known());
    }
}
