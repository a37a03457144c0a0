// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Wakeup events for monitor consumers.
//!
//! Queues signal over a bounded(1) channel, so bursts of enqueues coalesce into
//! one pending wakeup. A consumer that wakes must drain the queue fully.

/// Event to wake up a monitor consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorWakeup {
    /// New entries are available.
    DataAvailable,
    /// The queue was closed; no more entries will arrive.
    Closed,
}
