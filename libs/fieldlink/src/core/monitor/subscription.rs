// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};

use super::queue::{FlowControl, MonitorEntry, MonitorQueue, MonitorQueueStats};
use super::queue_depth::QueueDepth;
use super::wakeup::MonitorWakeup;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self(format!("S{}", cuid2::create_id()))
    }
}

impl Deref for SubscriptionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consumer end of one monitor.
///
/// Dropping the subscription closes its queue; the producer side prunes
/// closed queues on its next publication.
pub struct Subscription<T> {
    id: SubscriptionId,
    queue: Arc<MonitorQueue<T>>,
    wakeups: Receiver<MonitorWakeup>,
}

impl<T> Subscription<T> {
    /// Create a subscription and the producer handle to its queue.
    pub fn open(
        depth: QueueDepth,
        max_depth: usize,
        flow: FlowControl,
    ) -> (Self, Arc<MonitorQueue<T>>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let queue = Arc::new(MonitorQueue::new(depth, max_depth, flow).with_wakeup(tx));
        let subscription = Self {
            id: SubscriptionId::new(),
            queue: Arc::clone(&queue),
            wakeups: rx,
        };
        (subscription, queue)
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn try_next(&self) -> Option<MonitorEntry<T>> {
        self.queue.pop()
    }

    /// Wait up to `timeout` for the next entry.
    ///
    /// Returns `None` on timeout, or once the queue is closed and empty.
    pub fn next_timeout(&self, timeout: Duration) -> Option<MonitorEntry<T>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(entry) = self.queue.pop() {
                return Some(entry);
            }
            if self.queue.is_closed() {
                return None;
            }
            match self.wakeups.recv_deadline(deadline) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Disconnected) => return self.queue.pop(),
                Err(RecvTimeoutError::Timeout) => return None,
            }
        }
    }

    pub fn drain(&self) -> Vec<MonitorEntry<T>> {
        self.queue.drain()
    }

    pub fn acknowledge(&self, sequence: u64) -> u64 {
        self.queue.acknowledge(sequence)
    }

    pub fn stats(&self) -> MonitorQueueStats {
        self.queue.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn close(&self) {
        self.queue.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.queue.close();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_receives_entries() {
        let (sub, queue) = Subscription::open(QueueDepth::default(), 1024, FlowControl::DropOldest);
        queue.enqueue("x").unwrap();
        let entry = sub.next_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(entry.payload, "x");
        assert_eq!(sub.acknowledge(entry.sequence), 1);
    }

    #[test]
    fn test_next_timeout_expires() {
        let (sub, _queue) =
            Subscription::<u32>::open(QueueDepth::default(), 1024, FlowControl::DropOldest);
        assert!(sub.next_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_drop_closes_queue() {
        let (sub, queue) =
            Subscription::<u32>::open(QueueDepth::default(), 1024, FlowControl::DropOldest);
        assert!(sub.id().starts_with('S'));
        drop(sub);
        assert!(queue.is_closed());
        assert!(queue.enqueue(1).is_err());
    }
}
