// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Monitor queues: bounded handoff between update producers and subscribers.

mod queue;
mod queue_depth;
mod subscription;
mod wakeup;

pub use queue::{FlowControl, MonitorEntry, MonitorQueue, MonitorQueueStats};
pub use queue_depth::QueueDepth;
pub use subscription::{Subscription, SubscriptionId};
pub use wakeup::MonitorWakeup;
