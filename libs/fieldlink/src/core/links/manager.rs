// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Owns every link and remote channel and drives them from transport events.
//!
//! Lock order: `delivery` → `channels` → `links` → channel members → link
//! state. Delegates are only ever called with no lock held, except that
//! delivery runs under `delivery` so each queue has a single consumer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};

use super::channel::{RemoteChannel, RemoteUpdate};
use super::link::{Link, PutCompletion, Teardown};
use super::link_id::{LinkId, PutTicket};
use super::scheduler::ProcessingOrder;
use super::spec::{ChannelKey, LinkSpec, ProcRequest, SevrMode};
use super::state::{ConnectedState, ConnectionEvent, LinkState};
use crate::core::channel_ref::ChannelRef;
use crate::core::config::EngineConfig;
use crate::core::delegates::{
    ConnectRequest, FieldReading, FieldStorageDelegate, LinkDelegate, ProcessingHint,
    ProcessingReason, PutRequest, TransportDelegate,
};
use crate::core::error::{FieldLinkError, Result};
use crate::core::meta::Alarm;
use crate::core::monitor::{MonitorQueueStats, MonitorWakeup};
use crate::core::value::TypedValue;

const WORKER_POLL: Duration = Duration::from_millis(100);

pub struct LinkManager {
    config: EngineConfig,
    storage: Arc<dyn FieldStorageDelegate>,
    transport: Arc<dyn TransportDelegate>,
    delegate: Arc<dyn LinkDelegate>,
    channels: Mutex<HashMap<ChannelKey, Arc<RemoteChannel>>>,
    links: RwLock<HashMap<LinkId, Arc<Link>>>,
    next_ticket: AtomicU64,
    next_registration: AtomicU64,
    wakeup_tx: Sender<MonitorWakeup>,
    wakeup_rx: Receiver<MonitorWakeup>,
    worker: Mutex<Option<JoinHandle<()>>>,
    // Serializes consumers of the channel queues.
    delivery: Mutex<()>,
    shut_down: AtomicBool,
}

enum Report {
    Connected(Arc<Link>),
    Disconnected(Arc<Link>, Teardown),
}

impl LinkManager {
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn FieldStorageDelegate>,
        transport: Arc<dyn TransportDelegate>,
        delegate: Arc<dyn LinkDelegate>,
    ) -> Self {
        let (wakeup_tx, wakeup_rx) = crossbeam_channel::bounded(1);
        Self {
            config,
            storage,
            transport,
            delegate,
            channels: Mutex::new(HashMap::new()),
            links: RwLock::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
            next_registration: AtomicU64::new(0),
            wakeup_tx,
            wakeup_rx,
            worker: Mutex::new(None),
            delivery: Mutex::new(()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn link_count(&self) -> usize {
        self.links.read().len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn link_ids(&self) -> Vec<LinkId> {
        self.links.read().keys().cloned().collect()
    }

    pub fn channel_stats(&self, key: &ChannelKey) -> Option<MonitorQueueStats> {
        self.channels.lock().get(key).map(|c| c.queue().stats())
    }

    pub fn link(&self, id: &LinkId) -> Result<Arc<Link>> {
        self.links
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| FieldLinkError::NotFound(format!("link {}", id)))
    }

    /// Bind `local` to a remote value. The transport is asked to connect the
    /// first time a channel key is seen.
    pub fn define_link(&self, local: ChannelRef, spec: LinkSpec) -> Result<LinkId> {
        spec.validate()?;
        if self.is_shut_down() {
            return Err(FieldLinkError::LinkClosed("link manager is shut down".into()));
        }

        let registration = self.next_registration.fetch_add(1, Ordering::Relaxed);
        let link = Arc::new(Link::new(local, spec, registration));
        let key = link.key().clone();

        let (is_new, connected) = {
            let mut channels = self.channels.lock();
            let (channel, is_new) = match channels.get(&key) {
                Some(channel) => (Arc::clone(channel), false),
                None => {
                    let channel = Arc::new(RemoteChannel::new(
                        key.clone(),
                        self.config.max_queue_depth,
                        self.wakeup_tx.clone(),
                    ));
                    channels.insert(key.clone(), Arc::clone(&channel));
                    (channel, true)
                }
            };
            channel.add_member(Arc::clone(&link));
            self.links.write().insert(link.id().clone(), Arc::clone(&link));

            if let Some(from) = link.set_connecting() {
                self.log_transition(&link, from, LinkState::Connecting);
            }
            let connected = channel.is_connected() && link.set_connected().is_some();
            (is_new, connected)
        };

        tracing::info!(
            "[{}] defined link {} -> {}",
            link.id(),
            link.local(),
            key
        );

        if connected {
            self.log_transition(&link, LinkState::Connecting, LinkState::Connected(ConnectedState::Idle));
            self.delegate.did_connect(link.id());
        }

        if is_new {
            let request = ConnectRequest {
                key,
                local_only: self.config.isolate,
            };
            if let Err(e) = self.transport.connect(&request) {
                tracing::warn!("[{}] connect to {} failed: {}", link.id(), request.key, e);
                if let Err(remove_err) = self.remove_link(link.id()) {
                    tracing::warn!("[{}] cleanup failed: {}", link.id(), remove_err);
                }
                return Err(e);
            }
        }

        Ok(link.id().clone())
    }

    /// Tear a link down. A pending put is failed; the channel is disconnected
    /// when its last link leaves.
    pub fn remove_link(&self, id: &LinkId) -> Result<()> {
        let (link, teardown, orphaned) = {
            let mut channels = self.channels.lock();
            let link = self
                .links
                .write()
                .remove(id)
                .ok_or_else(|| FieldLinkError::NotFound(format!("link {}", id)))?;
            let remaining = channels.get(link.key()).map(|c| c.remove_member(&link));
            let orphaned = if remaining == Some(0) {
                channels.remove(link.key())
            } else {
                None
            };
            let teardown = link.close();
            (link, teardown, orphaned)
        };

        if let Some(from) = teardown.from {
            self.log_transition(&link, from, LinkState::Closed);
        }
        if let Some(ticket) = teardown.failed_put {
            let err = FieldLinkError::LinkClosed(format!("link {} removed", id));
            self.delegate.did_fail_put(id, ticket, &err);
        }
        if let Some(channel) = orphaned {
            self.retire_channel(&channel);
        }
        tracing::info!("[{}] removed link", id);
        Ok(())
    }

    /// Write `value` to `path` on the remote side (empty path: the link's own
    /// field). Returns the ticket of a put sent now, if one was.
    pub fn link_put(&self, id: &LinkId, path: &str, value: TypedValue) -> Result<Option<PutTicket>> {
        let link = self.link(id)?;
        let request = link.begin_put(path, value, self.next_ticket())?;
        self.send(&link, request)
    }

    /// Send the deferred writes of a link as one put.
    pub fn link_flush(&self, id: &LinkId) -> Result<Option<PutTicket>> {
        let link = self.link(id)?;
        let request = link.flush(self.next_ticket())?;
        self.send(&link, request)
    }

    pub fn link_read(&self, id: &LinkId) -> Result<FieldReading> {
        self.link(id)?.read()
    }

    pub fn link_state(&self, id: &LinkId) -> Result<LinkState> {
        Ok(self.link(id)?.state())
    }

    /// Completion of a put previously handed to the transport.
    pub fn put_completed(&self, id: &LinkId, ticket: PutTicket, result: Result<()>) -> Result<()> {
        let link = self.link(id)?;
        match link.complete_put(ticket, self.next_ticket()) {
            PutCompletion::Stale => {
                tracing::trace!("[{}] ignoring stale completion {}", id, ticket);
                Ok(())
            }
            PutCompletion::Done { next } => {
                match &result {
                    Ok(()) => self.log_put(&link, ticket, "completed"),
                    Err(e) => {
                        tracing::warn!("[{}] put {} failed: {}", id, ticket, e);
                        self.delegate.did_fail_put(id, ticket, e);
                    }
                }
                self.send(&link, next).map(|_| ())
            }
        }
    }

    /// Connection signal for one remote channel.
    pub fn connection_changed(&self, key: &ChannelKey, event: ConnectionEvent) -> Result<()> {
        let mut reports = Vec::new();
        let (members, dropped) = {
            let channels = self.channels.lock();
            let channel = channels
                .get(key)
                .cloned()
                .ok_or_else(|| FieldLinkError::NotFound(format!("remote channel {}", key)))?;
            channel.set_connected(event == ConnectionEvent::Connected);

            let members = channel.members();
            for link in &members {
                match event {
                    ConnectionEvent::Connecting => {
                        if let Some(from) = link.set_connecting() {
                            self.log_transition(link, from, LinkState::Connecting);
                        }
                    }
                    ConnectionEvent::Connected => {
                        if let Some(from) = link.set_connected() {
                            self.log_transition(link, from, LinkState::Connected(ConnectedState::Idle));
                            reports.push(Report::Connected(Arc::clone(link)));
                        }
                    }
                    ConnectionEvent::Disconnected => {
                        let teardown = link.set_disconnected();
                        if let Some(from) = teardown.from {
                            self.log_transition(link, from, LinkState::Disconnected);
                            reports.push(Report::Disconnected(Arc::clone(link), teardown));
                        }
                    }
                }
            }

            let dropped = if event == ConnectionEvent::Disconnected {
                let drained = channel.queue().drain();
                if let Some(last) = drained.last() {
                    channel.queue().acknowledge(last.sequence);
                }
                drained.len()
            } else {
                0
            };
            (members, dropped)
        };

        for report in reports {
            match report {
                Report::Connected(link) => self.delegate.did_connect(link.id()),
                Report::Disconnected(link, teardown) => {
                    if let Some(ticket) = teardown.failed_put {
                        let err = FieldLinkError::LinkDisconnected(format!(
                            "connection to {} lost",
                            key
                        ));
                        self.delegate.did_fail_put(link.id(), ticket, &err);
                    }
                    if teardown.discarded_writes > 0 {
                        tracing::debug!(
                            "[{}] discarded {} buffered writes",
                            link.id(),
                            teardown.discarded_writes
                        );
                    }
                    self.delegate.did_disconnect(link.id());
                }
            }
        }

        if dropped > 0 {
            tracing::debug!("{}: dropped {} undelivered updates", key, dropped);
            let err = FieldLinkError::LinkDisconnected(format!(
                "{} queued updates from {} dropped",
                dropped, key
            ));
            for link in &members {
                self.delegate.did_fail_get(link.id(), &err);
            }
        }
        Ok(())
    }

    /// Queue an inbound update. Blocks on a pipelined channel whose window is
    /// full until delivery catches up.
    pub fn remote_value_received(&self, key: &ChannelKey, update: RemoteUpdate) -> Result<u64> {
        let channel = self
            .channels
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| FieldLinkError::NotFound(format!("remote channel {}", key)))?;
        channel.queue().enqueue(update)
    }

    /// Deliver every queued update. Returns how many were delivered.
    ///
    /// Each round takes the oldest update of every channel, writes it to the
    /// member links' local fields, then issues processing for the whole round
    /// in `(monorder, registration)` order before acknowledging. Concurrent
    /// callers take turns, so updates land in arrival order.
    pub fn deliver_link_updates(&self) -> usize {
        let _delivery = self.delivery.lock();
        let channels: Vec<Arc<RemoteChannel>> = self.channels.lock().values().cloned().collect();
        let mut delivered = 0;

        loop {
            let round: Vec<_> = channels
                .iter()
                .filter_map(|c| c.queue().pop().map(|entry| (c, entry)))
                .collect();
            if round.is_empty() {
                break;
            }

            let mut order = ProcessingOrder::new();
            let mut touched = Vec::new();
            for (channel, entry) in &round {
                for link in channel.members() {
                    let Some(process) = self.store_update(&link, &entry.payload) else {
                        continue;
                    };
                    if process {
                        order.insert(link.spec().monorder, link.registration(), Arc::clone(&link));
                    }
                    touched.push(link);
                }
            }

            for link in order.drain() {
                let hint = ProcessingHint {
                    reason: ProcessingReason::LinkUpdate,
                    order: link.spec().monorder,
                };
                if let Err(e) = self.storage.request_processing(link.local(), hint) {
                    tracing::warn!("[{}] processing {} failed: {}", link.id(), link.local(), e);
                }
            }
            for link in touched {
                link.finish_get();
                self.delegate.did_deliver(link.id());
            }
            for (channel, entry) in round {
                channel.queue().acknowledge(entry.sequence);
                delivered += 1;
            }
        }
        delivered
    }

    /// Start a thread that delivers updates whenever a channel signals.
    pub fn start_worker(self: &Arc<Self>) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let manager: Weak<Self> = Arc::downgrade(self);
        let wakeups = self.wakeup_rx.clone();
        let handle = std::thread::Builder::new()
            .name("fieldlink-links".into())
            .spawn(move || {
                tracing::debug!("link worker started");
                loop {
                    let woke = match wakeups.recv_timeout(WORKER_POLL) {
                        Ok(_) => true,
                        Err(RecvTimeoutError::Timeout) => false,
                        Err(RecvTimeoutError::Disconnected) => break,
                    };
                    let Some(manager) = manager.upgrade() else {
                        break;
                    };
                    if manager.is_shut_down() {
                        break;
                    }
                    if woke {
                        manager.deliver_link_updates();
                    }
                }
                tracing::debug!("link worker stopped");
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Close every link and channel and stop the worker. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let channels: Vec<Arc<RemoteChannel>> = {
            let mut channels = self.channels.lock();
            channels.drain().map(|(_, c)| c).collect()
        };
        let links: Vec<Arc<Link>> = self.links.write().drain().map(|(_, l)| l).collect();

        for link in &links {
            let teardown = link.close();
            if let Some(from) = teardown.from {
                self.log_transition(link, from, LinkState::Closed);
            }
            if let Some(ticket) = teardown.failed_put {
                let err = FieldLinkError::LinkClosed("engine shut down".into());
                self.delegate.did_fail_put(link.id(), ticket, &err);
            }
        }
        for channel in &channels {
            self.retire_channel(channel);
        }
        let _ = self.wakeup_tx.try_send(MonitorWakeup::Closed);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                tracing::warn!("link worker panicked");
            }
        }
        tracing::info!("link manager shut down ({} links)", links.len());
    }

    fn retire_channel(&self, channel: &RemoteChannel) {
        channel.queue().close();
        let dropped = channel.queue().drain().len();
        if dropped > 0 {
            tracing::debug!("{}: discarded {} undelivered updates", channel.key(), dropped);
        }
        if let Err(e) = self.transport.disconnect(channel.key()) {
            tracing::warn!("disconnect from {} failed: {}", channel.key(), e);
        }
    }

    /// Store one update on one link. `Some(process)` if it was taken.
    fn store_update(&self, link: &Link, update: &RemoteUpdate) -> Option<bool> {
        let inbound = link.accept_update(update)?;
        let local = link.local();

        if let Err(e) = self.storage.write(local, &inbound.value) {
            tracing::warn!("[{}] write to {} failed: {}", link.id(), local, e);
            return Some(false);
        }

        if let Some(remote) = &inbound.alarm {
            if link.spec().sevr != SevrMode::Off {
                self.propagate_severity(link, remote);
            }
        }

        let process = match link.spec().proc {
            ProcRequest::None | ProcRequest::Skip => false,
            ProcRequest::Force => true,
            ProcRequest::IfPassive => self.storage.allows_passive_processing(local),
        };
        Some(process)
    }

    fn propagate_severity(&self, link: &Link, remote: &Alarm) {
        let local = link.local();
        match self.storage.read(local) {
            Ok(reading) => {
                if let Some(alarm) = link.spec().sevr.propagate(&reading.alarm, remote) {
                    if let Err(e) = self.storage.raise_alarm(local, &alarm) {
                        tracing::warn!("[{}] raising alarm on {} failed: {}", link.id(), local, e);
                    }
                }
            }
            Err(e) => tracing::warn!("[{}] reading {} failed: {}", link.id(), local, e),
        }
    }

    fn send(&self, link: &Link, request: Option<PutRequest>) -> Result<Option<PutTicket>> {
        let Some(request) = request else {
            return Ok(None);
        };
        let ticket = request.ticket;
        self.log_put(link, ticket, "sent");

        if let Err(e) = self.transport.put(request) {
            tracing::warn!("[{}] transport rejected put {}: {}", link.id(), ticket, e);
            let failure = FieldLinkError::Transport(e.to_string());
            self.put_completed(link.id(), ticket, Err(failure))?;
            return Err(e);
        }
        Ok(Some(ticket))
    }

    fn next_ticket(&self) -> PutTicket {
        PutTicket::from(self.next_ticket.fetch_add(1, Ordering::Relaxed))
    }

    fn log_transition(&self, link: &Link, from: LinkState, to: LinkState) {
        if self.config.verbose_links() {
            tracing::debug!("[{}] {} -> {} ({})", link.id(), from, to, link.spec().target);
        } else {
            tracing::trace!("[{}] {} -> {} ({})", link.id(), from, to, link.spec().target);
        }
    }

    fn log_put(&self, link: &Link, ticket: PutTicket, what: &str) {
        if self.config.verbose_links() {
            tracing::debug!("[{}] put {} {}", link.id(), ticket, what);
        } else {
            tracing::trace!("[{}] put {} {}", link.id(), ticket, what);
        }
    }
}

impl Drop for LinkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
