use std::fs;

use pretty_assertions::assert_eq;

use cadence::session::TypingSession;
use cadence::store::{JsonFileStore, SnapshotStore};
use cadence::{EngineConfig, SessionState};

#[test]
fn json_store_keeps_the_latest_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let mut store = JsonFileStore::new(&path);

    let mut session = TypingSession::start("Hi there", 8_000, 0, 1_000).unwrap();
    store.save(&session.snapshot(1_000)).unwrap();
    session.advance();
    session.advance();
    session.advance();
    session.pause(1_500);
    store.save(&session.snapshot(1_500)).unwrap();

    assert_eq!(store.path(), path.as_path());
    let loaded = store.load().unwrap().expect("snapshot on disk");
    assert_eq!(loaded, session.snapshot(1_500));
    assert_eq!(loaded.text, "Hi there");
    assert_eq!(loaded.status.state, SessionState::Paused);
    assert_eq!(loaded.status.current_index, 3);
    assert_eq!(loaded.status.paused_at, Some(1_500));
    assert_eq!(loaded.status.words_typed, 1);
}

#[test]
fn snapshot_json_is_flat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut store = JsonFileStore::new(&path);

    let session = TypingSession::start("abc", 3_000, 1, 0).unwrap();
    store.save(&session.snapshot(0)).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["state"], "running");
    assert_eq!(value["current_index"], 1);
    assert_eq!(value["text"], "abc");
}

#[test]
fn corrupt_snapshot_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "{not json").unwrap();

    let err = JsonFileStore::new(&path).load().unwrap_err();
    assert!(err.to_string().contains("state.json"), "{err}");
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.json");
    fs::write(
        &path,
        r#"{ "strategy": "key_sequence", "spread_ratio": 0.25, "state_file": "s.json" }"#,
    )
    .unwrap();

    let config = EngineConfig::from_file(&path).unwrap();
    assert_eq!(config.strategy, cadence::DeliveryStrategy::KeySequence);
    assert_eq!(config.spread_ratio, 0.25);
    assert_eq!(config.seed, None);
    assert_eq!(config.state_file.as_deref(), Some(std::path::Path::new("s.json")));
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.json");
    fs::write(&path, r#"{ "spread_ratio": -2 }"#).unwrap();

    let err = EngineConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("spread_ratio"), "{err}");

    let missing = EngineConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(missing.to_string().contains("absent.json"), "{missing}");
}
