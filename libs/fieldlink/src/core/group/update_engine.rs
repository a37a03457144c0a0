// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Turns single field changes into coherent group snapshots.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::group::{FieldAction, Group};
use super::snapshot::{FieldSnapshot, GroupSnapshot};
use crate::core::delegates::{FieldReading, FieldStorageDelegate, ProcessingHint, ProcessingReason};
use crate::core::error::{FieldLinkError, Result};
use crate::core::meta::reduce_meta;
use crate::core::monitor::{FlowControl, MonitorQueue, QueueDepth, Subscription};
use crate::core::value::TypedValue;

pub type GroupQueue = MonitorQueue<Arc<GroupSnapshot>>;
pub type GroupSubscription = Subscription<Arc<GroupSnapshot>>;

/// A live group: its tables, its snapshot lock and its subscribers.
pub struct GroupRuntime {
    group: Arc<Group>,
    // Held only across snapshot assembly.
    snapshot_lock: Mutex<()>,
    // Taken before `snapshot_lock` is released, held until enqueued.
    publish_order: Mutex<()>,
    subscribers: Mutex<Vec<Arc<GroupQueue>>>,
}

impl GroupRuntime {
    pub fn new(group: Group) -> Self {
        Self {
            group: Arc::new(group),
            snapshot_lock: Mutex::new(()),
            publish_order: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn group(&self) -> &Arc<Group> {
        &self.group
    }

    pub fn name(&self) -> &str {
        self.group.name()
    }

    pub fn subscribe(
        &self,
        depth: QueueDepth,
        max_depth: usize,
        flow: FlowControl,
    ) -> GroupSubscription {
        let (subscription, queue) = Subscription::open(depth, max_depth, flow);
        tracing::debug!("[{}] new subscriber {}", self.name(), subscription.id());
        self.subscribers.lock().push(queue);
        subscription
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|q| !q.is_closed());
        subscribers.len()
    }

    /// Handle a change to `field` and publish the resulting snapshot.
    ///
    /// Returns `Ok(None)` when the change resolves to no fields.
    pub fn field_changed(
        &self,
        field: &str,
        storage: &dyn FieldStorageDelegate,
    ) -> Result<Option<Arc<GroupSnapshot>>> {
        let index = self.group.field_index(field).ok_or_else(|| {
            FieldLinkError::NotFound(format!("field '{}' in group '{}'", field, self.name()))
        })?;
        let participants = self.group.participants(index);
        if participants.is_empty() {
            tracing::trace!("[{}] change to '{}' suppressed", self.name(), field);
            return Ok(None);
        }

        // Atomic groups hand back the publish guard so queue order matches
        // the order snapshots were read in.
        let (readings, _publish_order) = self.read_participants(participants, true, storage)?;
        let snapshot = Arc::new(self.build_snapshot(readings, Some(field)));
        self.publish(&snapshot);
        Ok(Some(snapshot))
    }

    /// Snapshot of every projected field.
    pub fn full_snapshot(&self, storage: &dyn FieldStorageDelegate) -> Result<GroupSnapshot> {
        let projected = self.group.projected();
        let (readings, _) = self.read_participants(&projected, false, storage)?;
        Ok(self.build_snapshot(readings, None))
    }

    /// Write `values` through the group in rank order.
    ///
    /// Every named field must exist and carry a put rank, or nothing is
    /// written. `proc` fields request processing instead of taking a value.
    pub fn put(
        &self,
        values: &BTreeMap<String, TypedValue>,
        storage: &dyn FieldStorageDelegate,
    ) -> Result<()> {
        for name in values.keys() {
            let field = self.group.field(name).ok_or_else(|| {
                FieldLinkError::NotFound(format!("field '{}' in group '{}'", name, self.name()))
            })?;
            if field.put_order.is_none() {
                return Err(FieldLinkError::PutNotAllowed(format!(
                    "field '{}' in group '{}' has no put order",
                    name,
                    self.name()
                )));
            }
        }

        for &index in self.group.put_plan() {
            let field = &self.group.fields()[index];
            let Some(value) = values.get(&field.name) else {
                continue;
            };
            let rank = field.put_order.unwrap_or_default();
            match self.group.action(index) {
                FieldAction::Process => storage.request_processing(
                    &field.channel,
                    ProcessingHint {
                        reason: ProcessingReason::GroupPut,
                        order: rank,
                    },
                )?,
                FieldAction::Project(_) => storage.write(&field.channel, value)?,
            }
            tracing::trace!("[{}] put '{}' at rank {}", self.name(), field.name, rank);
        }
        Ok(())
    }

    /// Close every subscriber queue.
    pub fn close(&self) {
        let subscribers = std::mem::take(&mut *self.subscribers.lock());
        for queue in subscribers {
            queue.close();
        }
    }

    /// Read the fields at `indices`, under the snapshot lock for atomic
    /// groups. With `ordered`, an atomic read also returns the publish-order
    /// guard, acquired before the snapshot lock is dropped.
    fn read_participants(
        &self,
        indices: &[usize],
        ordered: bool,
        storage: &dyn FieldStorageDelegate,
    ) -> Result<(Vec<(usize, FieldReading)>, Option<MutexGuard<'_, ()>>)> {
        if !self.group.is_atomic() {
            return Ok((self.read_all(indices, storage)?, None));
        }

        let channels = self.group.channels_of(indices);
        let snapshot_guard = self.snapshot_lock.lock();
        let mut readings = None;
        storage.with_channels_locked(&channels, &mut || {
            readings = Some(self.read_all(indices, storage));
        });
        let order = ordered.then(|| self.publish_order.lock());
        drop(snapshot_guard);

        let readings = readings.ok_or_else(|| {
            FieldLinkError::Storage(format!("group '{}' lock body did not run", self.name()))
        })??;
        Ok((readings, order))
    }

    fn build_snapshot(
        &self,
        readings: Vec<(usize, FieldReading)>,
        trigger: Option<&str>,
    ) -> GroupSnapshot {
        let meta = if self.group.propagates_meta() {
            reduce_meta(readings.iter().map(|(_, r)| (&r.alarm, &r.time)))
        } else {
            None
        };
        let (alarm, time) = match meta {
            Some((alarm, time)) => (Some(alarm), Some(time)),
            None => (None, None),
        };

        let mut fields = BTreeMap::new();
        for (index, reading) in readings {
            if let FieldAction::Project(project) = self.group.action(index) {
                let name = self.group.fields()[index].name.clone();
                fields.insert(name, project(reading));
            }
        }

        GroupSnapshot {
            group: self.name().to_string(),
            type_id: self.group.type_id().map(str::to_string),
            trigger: trigger.map(str::to_string),
            fields,
            alarm,
            time,
        }
    }

    fn read_all(
        &self,
        indices: &[usize],
        storage: &dyn FieldStorageDelegate,
    ) -> Result<Vec<(usize, FieldReading)>> {
        indices
            .iter()
            .map(|&index| {
                let field = &self.group.fields()[index];
                let mut reading = storage.read(&field.channel)?;
                if let Some(transform) = &field.time_tag {
                    transform.apply(&mut reading.time);
                }
                Ok((index, reading))
            })
            .collect()
    }

    fn publish(&self, snapshot: &Arc<GroupSnapshot>) {
        let queues: Vec<Arc<GroupQueue>> = {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|q| !q.is_closed());
            subscribers.clone()
        };
        for queue in queues {
            if let Err(e) = queue.enqueue(Arc::clone(snapshot)) {
                tracing::trace!("[{}] subscriber went away: {}", self.name(), e);
            }
        }
    }
}

impl std::fmt::Debug for GroupRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupRuntime")
            .field("group", &self.group.name())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}
