// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use fieldlink::core::delegates::{
    ConnectRequest, FieldReading, FieldStorageDelegate, LinkDelegate, ProcessingHint, PutRequest,
    TransportDelegate,
};
use fieldlink::core::error::{FieldLinkError, Result};
use fieldlink::core::links::{ChannelKey, LinkId, PutTicket};
use fieldlink::core::meta::Alarm;
use fieldlink::core::runtime::Engine;
use fieldlink::core::value::TypedValue;
use fieldlink::core::{ChannelRef, EngineConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageEvent {
    Write(String, TypedValue),
    Process(String, i32),
    Alarm(String, Alarm),
}

#[derive(Default)]
pub struct MockStorage {
    values: Mutex<HashMap<ChannelRef, FieldReading>>,
    events: Mutex<Vec<StorageEvent>>,
    no_passive: Mutex<HashSet<String>>,
    locked: Mutex<Vec<Vec<String>>>,
    slow_write: Mutex<Option<(TypedValue, Duration)>>,
}

impl MockStorage {
    pub fn set(&self, channel: &str, reading: FieldReading) {
        self.values.lock().insert(ChannelRef::new(channel), reading);
    }

    pub fn set_value(&self, channel: &str, value: impl Into<TypedValue>) {
        self.values
            .lock()
            .entry(ChannelRef::new(channel))
            .or_default()
            .value = value.into();
    }

    /// Stall every write of `value` for `delay`.
    pub fn slow_write(&self, value: impl Into<TypedValue>, delay: Duration) {
        *self.slow_write.lock() = Some((value.into(), delay));
    }

    pub fn value(&self, channel: &str) -> Option<TypedValue> {
        self.values
            .lock()
            .get(channel)
            .map(|reading| reading.value.clone())
    }

    pub fn disallow_passive(&self, channel: &str) {
        self.no_passive.lock().insert(channel.to_string());
    }

    pub fn events(&self) -> Vec<StorageEvent> {
        self.events.lock().clone()
    }

    pub fn processed(&self) -> Vec<(String, i32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StorageEvent::Process(channel, order) => Some((channel, order)),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(String, TypedValue)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StorageEvent::Write(channel, value) => Some((channel, value)),
                _ => None,
            })
            .collect()
    }

    pub fn lock_calls(&self) -> Vec<Vec<String>> {
        self.locked.lock().clone()
    }
}

impl FieldStorageDelegate for MockStorage {
    fn read(&self, channel: &ChannelRef) -> Result<FieldReading> {
        Ok(self.values.lock().get(channel).cloned().unwrap_or_default())
    }

    fn write(&self, channel: &ChannelRef, value: &TypedValue) -> Result<()> {
        let delay = match &*self.slow_write.lock() {
            Some((slow, delay)) if slow == value => Some(*delay),
            _ => None,
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.set_value(channel, value.clone());
        self.events
            .lock()
            .push(StorageEvent::Write(channel.to_string(), value.clone()));
        Ok(())
    }

    fn raise_alarm(&self, channel: &ChannelRef, alarm: &Alarm) -> Result<()> {
        self.values
            .lock()
            .entry(channel.clone())
            .or_default()
            .alarm = alarm.clone();
        self.events
            .lock()
            .push(StorageEvent::Alarm(channel.to_string(), alarm.clone()));
        Ok(())
    }

    fn request_processing(&self, channel: &ChannelRef, hint: ProcessingHint) -> Result<()> {
        self.events
            .lock()
            .push(StorageEvent::Process(channel.to_string(), hint.order));
        Ok(())
    }

    fn allows_passive_processing(&self, channel: &ChannelRef) -> bool {
        !self.no_passive.lock().contains(channel.as_str())
    }

    fn with_channels_locked(&self, channels: &[ChannelRef], body: &mut dyn FnMut()) {
        self.locked
            .lock()
            .push(channels.iter().map(|c| c.to_string()).collect());
        body()
    }
}

#[derive(Default)]
pub struct MockTransport {
    connects: Mutex<Vec<ConnectRequest>>,
    disconnects: Mutex<Vec<ChannelKey>>,
    puts: Mutex<Vec<PutRequest>>,
    reject_targets: Mutex<HashSet<String>>,
    reject_puts: AtomicBool,
}

impl MockTransport {
    pub fn reject_target(&self, target: &str) {
        self.reject_targets.lock().insert(target.to_string());
    }

    pub fn reject_puts(&self, reject: bool) {
        self.reject_puts.store(reject, Ordering::SeqCst);
    }

    pub fn connects(&self) -> Vec<ConnectRequest> {
        self.connects.lock().clone()
    }

    pub fn disconnects(&self) -> Vec<ChannelKey> {
        self.disconnects.lock().clone()
    }

    pub fn puts(&self) -> Vec<PutRequest> {
        self.puts.lock().clone()
    }
}

impl TransportDelegate for MockTransport {
    fn connect(&self, request: &ConnectRequest) -> Result<()> {
        if self.reject_targets.lock().contains(&request.key.target) {
            return Err(FieldLinkError::Transport(format!(
                "cannot resolve {}",
                request.key.target
            )));
        }
        self.connects.lock().push(request.clone());
        Ok(())
    }

    fn disconnect(&self, key: &ChannelKey) -> Result<()> {
        self.disconnects.lock().push(key.clone());
        Ok(())
    }

    fn put(&self, request: PutRequest) -> Result<()> {
        if self.reject_puts.load(Ordering::SeqCst) {
            return Err(FieldLinkError::Transport("put rejected".into()));
        }
        self.puts.lock().push(request);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingLinkDelegate {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub deliveries: AtomicUsize,
    pub failed_puts: Mutex<Vec<(LinkId, PutTicket, String)>>,
    pub failed_gets: AtomicUsize,
}

impl LinkDelegate for RecordingLinkDelegate {
    fn did_connect(&self, _link_id: &LinkId) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn did_disconnect(&self, _link_id: &LinkId) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn did_fail_put(&self, link_id: &LinkId, ticket: PutTicket, error: &FieldLinkError) {
        self.failed_puts
            .lock()
            .push((link_id.clone(), ticket, error.to_string()));
    }

    fn did_fail_get(&self, _link_id: &LinkId, _error: &FieldLinkError) {
        self.failed_gets.fetch_add(1, Ordering::SeqCst);
    }

    fn did_deliver(&self, _link_id: &LinkId) {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub engine: Engine,
    pub storage: Arc<MockStorage>,
    pub transport: Arc<MockTransport>,
    pub delegate: Arc<RecordingLinkDelegate>,
}

pub fn harness() -> Harness {
    harness_with_config(EngineConfig::default())
}

pub fn harness_with_config(config: EngineConfig) -> Harness {
    let storage = Arc::new(MockStorage::default());
    let transport = Arc::new(MockTransport::default());
    let delegate = Arc::new(RecordingLinkDelegate::default());
    let engine = Engine::builder()
        .with_config(config)
        .with_field_storage_arc(storage.clone())
        .with_transport_arc(transport.clone())
        .with_link_delegate_arc(delegate.clone())
        .build()
        .expect("engine builds");
    Harness {
        engine,
        storage,
        transport,
        delegate,
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
