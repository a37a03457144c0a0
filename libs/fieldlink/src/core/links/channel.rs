// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! A remote subscription shared by every link with the same [`ChannelKey`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::link::Link;
use super::scheduler::ProcessingOrder;
use super::spec::ChannelKey;
use crate::core::meta::{Alarm, TimeStamp};
use crate::core::monitor::{FlowControl, MonitorQueue, MonitorWakeup};
use crate::core::value::TypedValue;

/// One update of a remote value as reported by the transport.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteUpdate {
    pub value: TypedValue,
    #[serde(default)]
    pub alarm: Option<Alarm>,
    #[serde(default)]
    pub time: Option<TimeStamp>,
    /// Named sub-fields, selected by links with a non-empty `field`.
    #[serde(default)]
    pub fields: BTreeMap<String, TypedValue>,
}

impl RemoteUpdate {
    pub fn new(value: impl Into<TypedValue>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_alarm(mut self, alarm: Alarm) -> Self {
        self.alarm = Some(alarm);
        self
    }

    pub fn with_time(mut self, time: TimeStamp) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

pub(crate) struct RemoteChannel {
    key: ChannelKey,
    queue: MonitorQueue<RemoteUpdate>,
    members: RwLock<ProcessingOrder<Arc<Link>>>,
    connected: AtomicBool,
}

impl RemoteChannel {
    pub fn new(key: ChannelKey, max_depth: usize, wakeup: Sender<MonitorWakeup>) -> Self {
        let queue = MonitorQueue::new(
            key.queue_depth,
            max_depth,
            FlowControl::from_pipeline(key.pipeline),
        )
        .with_wakeup(wakeup);
        Self {
            key,
            queue,
            members: RwLock::new(ProcessingOrder::new()),
            connected: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn queue(&self) -> &MonitorQueue<RemoteUpdate> {
        &self.queue
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn add_member(&self, link: Arc<Link>) {
        let (rank, registration) = (link.spec().monorder, link.registration());
        self.members.write().insert(rank, registration, link);
    }

    /// Remove a member. Returns how many remain.
    pub fn remove_member(&self, link: &Link) -> usize {
        let mut members = self.members.write();
        members.remove_by(|m| m.id() == link.id());
        members.len()
    }

    /// Members in `(monorder, registration)` order.
    pub fn members(&self) -> Vec<Arc<Link>> {
        self.members.read().to_vec()
    }
}
