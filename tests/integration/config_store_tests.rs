//! Integration tests for the configuration document: file store, edits,
//! and installing what was loaded into a running engine.

use std::fs;

use valvecontrol::app::commands::Intent;
use valvecontrol::app::engine::ZoneEngine;
use valvecontrol::app::ports::{ConfigError, ConfigPort};
use valvecontrol::adapters::json_store::JsonFileStore;
use valvecontrol::config::ZoneConfig;
use valvecontrol::zones::NO_MASTER;

use crate::mock_channel::MockChannel;

const DOCUMENT: &str = r#"{
  "zones": [
    {"name": "Water pump", "enabled": true, "master_zone": -1, "is_master": true},
    {"name": "Lawn", "enabled": true, "master_zone": 0, "is_master": false},
    {"name": "Beds", "enabled": false, "master_zone": 0, "is_master": false}
  ],
  "general": {
    "open_master_automatically": true,
    "close_master_automatically": false,
    "close_dependent_automatically": true
  },
  "mqtt": {"enabled": false, "broker": "192.168.1.10", "topic_prefix": "garden"}
}"#;

#[test]
fn loaded_document_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zones.json");
    fs::write(&path, DOCUMENT).unwrap();

    let store = JsonFileStore::new(&path);
    let config = store.load().unwrap();
    assert_eq!(config.mqtt.topic_prefix, "garden");
    assert_eq!(config.mqtt.port, 1883);
    assert!(!store.has_unsaved_changes(&config));

    let channel = MockChannel::new();
    let engine = ZoneEngine::new(channel.clone());
    engine.install_config(&config.zones, config.policy).unwrap();

    engine.handle_intent(Intent::local(1, true)).unwrap();
    engine.handle_intent(Intent::local(2, true)).unwrap();
    engine.handle_intent(Intent::local(1, false)).unwrap();

    assert!(engine.is_active(0), "close_master_automatically is off");
    assert!(!engine.is_active(2), "Beds is disabled");
    assert_eq!(channel.sent(), vec![(0, true), (1, true), (1, false)]);
}

#[test]
fn invalid_document_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zones.json");
    fs::write(
        &path,
        r#"{"zones": [{"name": "", "enabled": true, "master_zone": -1, "is_master": false}],
            "general": {"open_master_automatically": true}}"#,
    )
    .unwrap();

    assert!(matches!(
        JsonFileStore::new(&path).load(),
        Err(ConfigError::ValidationFailed(_))
    ));
}

#[test]
fn edits_survive_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("zones.json"));

    let mut config = ZoneConfig::default();
    assert_eq!(config.add_zone(), Some(2));
    assert!(config.set_master_flag(2, true));
    config.zones[1].master_zone = 2;
    assert!(config.set_master_flag(0, false));
    assert!(store.has_unsaved_changes(&config));

    store.save(&config).unwrap();
    assert!(!store.has_unsaved_changes(&config));

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, config);
    assert!(reloaded.zones[2].is_master);
    assert_eq!(reloaded.zones[1].master_zone, 2);
    assert!(reloaded.zones.iter().all(|z| z.master_zone != 0 || z.is_master));
}

#[test]
fn removed_master_leaves_no_dangling_references() {
    let mut config = ZoneConfig::default();
    config.add_zone();
    config.set_master_flag(2, true);
    config.zones[1].master_zone = 2;

    let removed = config.remove_zone().unwrap();
    assert!(removed.is_master);
    assert_eq!(config.zones[1].master_zone, NO_MASTER);

    let engine = ZoneEngine::new(MockChannel::new());
    engine.install_config(&config.zones, config.policy).unwrap();
    engine.handle_intent(Intent::local(1, true)).unwrap();
    assert!(!engine.is_active(0), "Lawn no longer depends on the pump");
}

#[test]
fn opening_another_document_resets_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let other = dir.path().join("other.json");
    fs::write(&other, DOCUMENT).unwrap();

    let engine = ZoneEngine::new(MockChannel::new());
    let current = ZoneConfig::default();
    engine.install_config(&current.zones, current.policy).unwrap();
    engine.handle_intent(Intent::local(1, true)).unwrap();
    assert_eq!(engine.install_config_if_idle(&current.zones, current.policy), Ok(false));

    let opened = JsonFileStore::new(&other).load().unwrap();
    engine.install_config(&opened.zones, opened.policy).unwrap();

    assert_eq!(engine.snapshot().len(), 3);
    assert!(engine.snapshot().iter().all(|z| !z.active));
    assert_eq!(engine.snapshot()[1].name, "Lawn");
}

#[test]
fn save_as_tracks_changes_against_the_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = JsonFileStore::new(dir.path().join("zones.json"));
    let mut config = ZoneConfig::default();
    first.save(&config).unwrap();

    assert!(config.rename(1, "Back lawn"));
    assert!(first.has_unsaved_changes(&config));

    let copy = JsonFileStore::new(dir.path().join("copy.json"));
    copy.save(&config).unwrap();
    assert!(!copy.has_unsaved_changes(&config));
    assert_eq!(copy.load().unwrap().zones[1].name, "Back lawn");
    assert_eq!(first.load().unwrap().zones[1].name, "Lawn");
}
