// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Links: bindings from local fields to remote values.
//!
//! Links that name the same target, queue depth and flow control share one
//! [`RemoteUpdate`] queue. The transport is driven through
//! [`TransportDelegate`](crate::core::delegates::TransportDelegate) and reports
//! back through the [`LinkManager`] callbacks.

mod channel;
mod deferred;
mod link;
mod link_id;
mod manager;
mod scheduler;
mod spec;
mod state;

pub use channel::RemoteUpdate;
pub use deferred::DeferredWrites;
pub use link::Link;
pub use link_id::{LinkId, PutTicket};
pub use manager::LinkManager;
pub use scheduler::ProcessingOrder;
pub use spec::{ChannelKey, LinkSpec, ProcRequest, RemoteProcessing, SevrMode};
pub use state::{ConnectedState, ConnectionEvent, LinkState};
