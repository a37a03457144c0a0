// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Configuration Loading Tests
//!
//! Loads engine settings and group/link descriptors from disk and installs
//! them into a running engine.

mod common;

use serial_test::serial;
use std::time::Duration;

use fieldlink::core::ChannelRef;
use fieldlink::core::config::EngineConfig;
use fieldlink::core::error::FieldLinkError;
use fieldlink::core::links::{ConnectionEvent, LinkSpec, RemoteUpdate};
use fieldlink::core::monitor::FlowControl;
use fieldlink::core::runtime::EngineConfiguration;
use fieldlink::core::value::TypedValue;

use common::harness_with_config;

const DESCRIPTORS: &str = r#"
groups:
  - name: motor
    fields:
      - name: position
        channel: "rec:motor.RBV"
        triggers: "*"
      - name: setpoint
        channel: "rec:motor.VAL"
        mapping: plain
        triggers: "position"
links:
  - local: "rec:motor.VAL"
    pv: "remote:setpoint"
    proc: NPP
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[test]
#[serial]
fn test_load_engine_config_from_dir() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(EngineConfig::FILE_NAME),
        "link_debug: 4\nisolate: true\nmax_queue_depth: 8\n",
    )
    .unwrap();

    let config = EngineConfig::load(dir.path()).unwrap();
    assert!(config.verbose_links());
    assert!(config.isolate);
    assert_eq!(config.max_queue_depth, 8);
    assert_eq!(config.default_queue_depth, 4);
}

#[test]
#[serial]
fn test_missing_engine_config() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        EngineConfig::load(dir.path()),
        Err(FieldLinkError::Configuration(_))
    ));
    assert_eq!(EngineConfig::load_or_default(dir.path()), EngineConfig::default());
}

#[test]
#[serial]
fn test_invalid_engine_config_falls_back_to_defaults() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(EngineConfig::FILE_NAME), "max_queue_depth: 0\n").unwrap();

    assert!(EngineConfig::load(dir.path()).is_err());
    assert_eq!(EngineConfig::load_or_default(dir.path()), EngineConfig::default());
}

#[test]
#[serial]
fn test_descriptors_from_file_drive_engine() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(EngineConfig::FILE_NAME),
        "link_debug: 3\n",
    )
    .unwrap();
    let path = dir.path().join("motor.yaml");
    std::fs::write(&path, DESCRIPTORS).unwrap();

    let h = harness_with_config(EngineConfig::load_or_default(dir.path()));
    let configuration = EngineConfiguration::load(&path).unwrap();
    let link_ids = h.engine.apply_configuration(configuration).unwrap();
    assert_eq!(link_ids.len(), 1);
    assert_eq!(h.engine.group_names(), vec!["motor".to_string()]);

    let sub = h
        .engine
        .subscribe_group("motor", None, FlowControl::DropOldest)
        .unwrap();
    assert_eq!(sub.stats().depth, 4);

    let key = LinkSpec::new("remote:setpoint").channel_key();
    h.engine
        .connection_changed(&key, ConnectionEvent::Connected)
        .unwrap();
    h.engine
        .remote_value_received(&key, RemoteUpdate::new(12.5f64))
        .unwrap();
    assert_eq!(h.engine.deliver_link_updates(), 1);
    assert!(h.storage.processed().is_empty());

    // The setpoint only rides along with position.
    assert_eq!(h.engine.field_changed(&ChannelRef::new("rec:motor.VAL")), 0);

    h.storage.set_value("rec:motor.RBV", 12.4f64);
    assert_eq!(h.engine.field_changed(&ChannelRef::new("rec:motor.RBV")), 1);
    let snapshot = sub.next_timeout(Duration::from_millis(100)).unwrap().payload;
    assert_eq!(
        snapshot.field("setpoint").and_then(|f| f.value()),
        Some(&TypedValue::F64(12.5))
    );
    assert_eq!(
        snapshot.field("position").and_then(|f| f.value()),
        Some(&TypedValue::F64(12.4))
    );
}
