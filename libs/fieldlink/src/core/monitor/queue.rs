// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bounded per-subscriber FIFO with drop-oldest or pipelined flow control.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crossbeam_channel::Sender;
use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use super::queue_depth::QueueDepth;
use super::wakeup::MonitorWakeup;
use crate::core::error::{FieldLinkError, Result};

/// What happens when an enqueue finds the queue full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    /// Discard the oldest entry and count it.
    #[default]
    DropOldest,
    /// Block the producer until the consumer acknowledges.
    Pipelined,
}

impl FlowControl {
    pub fn from_pipeline(pipeline: bool) -> Self {
        if pipeline {
            FlowControl::Pipelined
        } else {
            FlowControl::DropOldest
        }
    }
}

/// One pending update with its sequence number (first is 1).
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorEntry<T> {
    pub sequence: u64,
    pub payload: T,
}

/// Point-in-time counters for one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MonitorQueueStats {
    pub depth: usize,
    pub len: usize,
    pub enqueued: u64,
    pub dropped: u64,
    pub acknowledged: u64,
    pub high_water: usize,
}

struct ProducerState {
    next_sequence: u64,
}

pub struct MonitorQueue<T> {
    entries: ArrayQueue<MonitorEntry<T>>,
    flow: FlowControl,
    producer: Mutex<ProducerState>,
    space_available: Condvar,
    acknowledged: AtomicU64,
    // Highest sequence handed to the consumer.
    popped: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    high_water: AtomicUsize,
    closed: AtomicBool,
    wakeup: Option<Sender<MonitorWakeup>>,
}

impl<T> MonitorQueue<T> {
    /// Create a queue. `requested` is clamped into `1..=max_depth`.
    pub fn new(requested: QueueDepth, max_depth: usize, flow: FlowControl) -> Self {
        let depth = requested.clamped(max_depth);
        if depth != requested {
            tracing::debug!(
                "monitor queue depth {} clamped to {}",
                requested,
                depth
            );
        }
        Self {
            entries: ArrayQueue::new(depth.get()),
            flow,
            producer: Mutex::new(ProducerState { next_sequence: 1 }),
            space_available: Condvar::new(),
            acknowledged: AtomicU64::new(0),
            popped: AtomicU64::new(0),
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            high_water: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            wakeup: None,
        }
    }

    /// Signal `sender` whenever entries arrive or the queue closes.
    pub fn with_wakeup(mut self, sender: Sender<MonitorWakeup>) -> Self {
        self.wakeup = Some(sender);
        self
    }

    pub fn depth(&self) -> usize {
        self.entries.capacity()
    }

    pub fn flow_control(&self) -> FlowControl {
        self.flow
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Append an entry and return its sequence number.
    ///
    /// Under [`FlowControl::Pipelined`] this blocks while `depth` entries are
    /// unacknowledged. Fails with `QueueClosed` once the queue is closed,
    /// including when closed while waiting.
    pub fn enqueue(&self, payload: T) -> Result<u64> {
        let mut producer = self.producer.lock();

        if self.flow == FlowControl::Pipelined {
            while !self.is_closed() && self.outstanding(producer.next_sequence) >= self.depth() as u64 {
                self.space_available.wait(&mut producer);
            }
        }
        if self.is_closed() {
            return Err(FieldLinkError::QueueClosed(format!(
                "enqueue of sequence {} rejected",
                producer.next_sequence
            )));
        }

        let sequence = producer.next_sequence;
        producer.next_sequence += 1;

        let entry = MonitorEntry { sequence, payload };
        if let Some(displaced) = self.entries.force_push(entry) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                "monitor queue full, dropped sequence {} for {}",
                displaced.sequence,
                sequence
            );
        }
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.high_water.fetch_max(self.entries.len(), Ordering::Relaxed);
        drop(producer);

        self.signal(MonitorWakeup::DataAvailable);
        Ok(sequence)
    }

    /// Take the oldest entry.
    pub fn pop(&self) -> Option<MonitorEntry<T>> {
        let entry = self.entries.pop()?;
        self.popped.fetch_max(entry.sequence, Ordering::AcqRel);
        Some(entry)
    }

    /// Take every queued entry in arrival order.
    pub fn drain(&self) -> Vec<MonitorEntry<T>> {
        let mut drained = Vec::with_capacity(self.entries.len());
        while let Some(entry) = self.pop() {
            drained.push(entry);
        }
        drained
    }

    /// Acknowledge delivery of every entry up to and including `sequence`.
    ///
    /// Returns how many entries this call newly acknowledged. Repeated or
    /// stale acknowledgements count zero, and nothing past the last entry
    /// taken from the queue is acknowledged.
    pub fn acknowledge(&self, sequence: u64) -> u64 {
        let target = sequence.min(self.popped.load(Ordering::Acquire));

        let mut current = self.acknowledged.load(Ordering::Acquire);
        let advanced = loop {
            if target <= current {
                break 0;
            }
            match self.acknowledged.compare_exchange_weak(
                current,
                target,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break target - current,
                Err(actual) => current = actual,
            }
        };

        if advanced > 0 && self.flow == FlowControl::Pipelined {
            let _producer = self.producer.lock();
            self.space_available.notify_all();
        }
        advanced
    }

    /// Reject further enqueues and wake any blocked producer or consumer.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let _producer = self.producer.lock();
            self.space_available.notify_all();
        }
        self.signal(MonitorWakeup::Closed);
    }

    pub fn stats(&self) -> MonitorQueueStats {
        MonitorQueueStats {
            depth: self.depth(),
            len: self.len(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Acquire),
            high_water: self.high_water.load(Ordering::Relaxed),
        }
    }

    fn outstanding(&self, next_sequence: u64) -> u64 {
        (next_sequence - 1).saturating_sub(self.acknowledged.load(Ordering::Acquire))
    }

    fn signal(&self, event: MonitorWakeup) {
        if let Some(sender) = &self.wakeup {
            // Full means a wakeup is already pending.
            let _ = sender.try_send(event);
        }
    }
}

impl<T> std::fmt::Debug for MonitorQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorQueue")
            .field("flow", &self.flow)
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_drop_oldest_keeps_last_entries_in_order() {
        let queue = MonitorQueue::new(QueueDepth::from(2), 1024, FlowControl::DropOldest);
        queue.enqueue("a").unwrap();
        queue.enqueue("b").unwrap();
        queue.enqueue("c").unwrap();

        let drained: Vec<_> = queue.drain().into_iter().map(|e| e.payload).collect();
        assert_eq!(drained, vec!["b", "c"]);
        assert_eq!(queue.stats().dropped, 1);
        assert_eq!(queue.stats().enqueued, 3);
    }

    #[test]
    fn test_sequences_start_at_one() {
        let queue = MonitorQueue::new(QueueDepth::default(), 1024, FlowControl::DropOldest);
        assert_eq!(queue.enqueue(10).unwrap(), 1);
        assert_eq!(queue.enqueue(11).unwrap(), 2);
        assert_eq!(queue.pop().unwrap().sequence, 1);
    }

    #[test]
    fn test_depth_is_clamped() {
        let queue: MonitorQueue<u8> =
            MonitorQueue::new(QueueDepth::from(5000), 64, FlowControl::DropOldest);
        assert_eq!(queue.depth(), 64);
        let queue: MonitorQueue<u8> =
            MonitorQueue::new(QueueDepth::from(0), 64, FlowControl::DropOldest);
        assert_eq!(queue.depth(), 1);
    }

    #[test]
    fn test_acknowledge_counts_once() {
        let queue = MonitorQueue::new(QueueDepth::from(4), 1024, FlowControl::DropOldest);
        for i in 0..3 {
            queue.enqueue(i).unwrap();
        }
        queue.pop().unwrap();
        queue.pop().unwrap();
        assert_eq!(queue.acknowledge(2), 2);
        assert_eq!(queue.acknowledge(2), 0);
        assert_eq!(queue.acknowledge(1), 0);
        // Cannot acknowledge past what was taken.
        assert_eq!(queue.acknowledge(99), 0);
        queue.pop().unwrap();
        assert_eq!(queue.acknowledge(99), 1);
        assert_eq!(queue.stats().acknowledged, 3);
    }

    #[test]
    fn test_closed_queue_rejects_enqueue() {
        let queue = MonitorQueue::new(QueueDepth::default(), 1024, FlowControl::DropOldest);
        queue.close();
        assert!(matches!(
            queue.enqueue(1),
            Err(FieldLinkError::QueueClosed(_))
        ));
    }

    #[test]
    fn test_pipelined_blocks_until_acknowledged() {
        let queue = Arc::new(MonitorQueue::new(
            QueueDepth::from(1),
            1024,
            FlowControl::Pipelined,
        ));
        queue.enqueue(1).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.enqueue(2))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());

        let entry = queue.pop().unwrap();
        queue.acknowledge(entry.sequence);

        assert_eq!(producer.join().unwrap().unwrap(), 2);
        assert_eq!(queue.stats().dropped, 0);
    }

    #[test]
    fn test_acknowledging_unread_entries_keeps_window_closed() {
        let queue = Arc::new(MonitorQueue::new(
            QueueDepth::from(1),
            1024,
            FlowControl::Pipelined,
        ));
        queue.enqueue(1).unwrap();
        assert_eq!(queue.acknowledge(1), 0);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.enqueue(2))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());

        let entry = queue.pop().unwrap();
        assert_eq!(entry.payload, 1);
        assert_eq!(queue.acknowledge(entry.sequence), 1);
        assert_eq!(producer.join().unwrap().unwrap(), 2);
        assert_eq!(queue.pop().unwrap().payload, 2);
        assert_eq!(queue.stats().dropped, 0);
    }

    #[test]
    fn test_close_releases_blocked_producer() {
        let queue = Arc::new(MonitorQueue::new(
            QueueDepth::from(1),
            1024,
            FlowControl::Pipelined,
        ));
        queue.enqueue(1).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.enqueue(2))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();

        assert!(matches!(
            producer.join().unwrap(),
            Err(FieldLinkError::QueueClosed(_))
        ));
    }

    #[test]
    fn test_wakeups_coalesce() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let queue =
            MonitorQueue::new(QueueDepth::from(8), 1024, FlowControl::DropOldest).with_wakeup(tx);
        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        queue.enqueue(3).unwrap();

        assert_eq!(rx.try_recv().unwrap(), MonitorWakeup::DataAvailable);
        assert!(rx.try_recv().is_err());
        assert_eq!(queue.drain().len(), 3);
    }
}
