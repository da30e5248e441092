//! Configuration store and user memory tests

use std::time::Duration;

use gaia::config::{ConfigStore, Settings, default_config};
use gaia::memory::UserMemory;
use serde_json::{Value, json};

mod common;

#[test]
fn test_first_open_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let store = ConfigStore::open(&path).unwrap();

    assert!(path.exists());
    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, default_config());
    assert_eq!(store.get("assistant.name"), Some(&json!("Gaia")));
    assert_eq!(store.get("gui.window_size"), Some(&json!([1000, 700])));
}

#[test]
fn test_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut store = ConfigStore::open(&path).unwrap();
    store.set("audio.max_utterance_secs", json!(12)).unwrap();
    store.set("plugins.weather.city", json!("Lisbon")).unwrap();

    let reopened = ConfigStore::open(&path).unwrap();
    assert_eq!(reopened.get_or("audio.max_utterance_secs", 0_u64), 12);
    assert_eq!(reopened.get_str("plugins.weather.city").as_deref(), Some("Lisbon"));

    let settings = Settings::from_store(&reopened);
    assert_eq!(settings.audio.max_utterance, Duration::from_secs(12));
}

#[test]
fn test_corrupt_file_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = ConfigStore::open(&path).unwrap();

    assert_eq!(store.get_str("llm.model").as_deref(), Some("llama3"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn test_set_replaces_scalar_on_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ConfigStore::open(dir.path().join("config.json")).unwrap();

    store.set("assistant.name", json!("Nova")).unwrap();
    store.set("assistant.name.short", json!("N")).unwrap();

    assert_eq!(store.get("assistant.name"), Some(&json!({ "short": "N" })));
    assert!(store.set("assistant..name", json!(1)).is_err());
}

#[test]
fn test_missing_values_fall_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ConfigStore::open(dir.path().join("config.json")).unwrap();
    store.set("agent.conversation_timeout_secs", json!("soon")).unwrap();

    let settings = Settings::from_store(&store);
    assert_eq!(settings.agent.conversation_timeout, Duration::from_secs(30));
    assert_eq!(store.get("does.not.exist"), None);
}

#[test]
fn test_memory_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user_memory.json");

    let mut memory = UserMemory::load(&path);
    assert!(!memory.is_user_known());
    memory.set_user_name("Sam").unwrap();

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["name"], "Sam");
    let stamp = raw["last_seen"].as_str().unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok());

    let reloaded = UserMemory::load(&path);
    assert_eq!(reloaded.user_name(), Some("Sam"));
    assert_eq!(reloaded.last_seen(), memory.last_seen());
}

#[test]
fn test_corrupt_memory_is_empty_profile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user_memory.json");
    std::fs::write(&path, "[1, 2").unwrap();

    let memory = UserMemory::load(&path);
    assert!(memory.user_name().is_none());
    assert!(memory.last_seen().is_none());
}

#[test]
fn test_forget_clears_profile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user_memory.json");

    let mut memory = UserMemory::load(&path);
    memory.set_user_name("Sam").unwrap();
    memory.clear().unwrap();

    assert!(!UserMemory::load(&path).is_user_known());
}
