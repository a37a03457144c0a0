// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Link delegate trait for connection lifecycle callbacks.

use std::sync::Arc;

use crate::core::error::FieldLinkError;
use crate::core::links::{LinkId, PutTicket};

/// Delegate for link lifecycle events.
///
/// All methods have default no-op implementations, so you only need
/// to override the ones you care about.
pub trait LinkDelegate: Send + Sync {
    /// Called after a link reaches `Connected`.
    fn did_connect(&self, _link_id: &LinkId) {}

    /// Called after a link drops back to `Disconnected`.
    fn did_disconnect(&self, _link_id: &LinkId) {}

    /// Called when a put is failed locally or rejected by the transport.
    fn did_fail_put(&self, _link_id: &LinkId, _ticket: PutTicket, _error: &FieldLinkError) {}

    /// Called when queued remote updates are dropped without delivery.
    fn did_fail_get(&self, _link_id: &LinkId, _error: &FieldLinkError) {}

    /// Called after a remote update is stored on the link.
    fn did_deliver(&self, _link_id: &LinkId) {}
}

/// Default implementation that does nothing.
pub struct DefaultLinkDelegate;

impl LinkDelegate for DefaultLinkDelegate {}

impl Default for DefaultLinkDelegate {
    fn default() -> Self {
        Self
    }
}

// =============================================================================
// Blanket implementation for Arc wrapper
// =============================================================================

impl LinkDelegate for Arc<dyn LinkDelegate> {
    fn did_connect(&self, link_id: &LinkId) {
        (**self).did_connect(link_id)
    }

    fn did_disconnect(&self, link_id: &LinkId) {
        (**self).did_disconnect(link_id)
    }

    fn did_fail_put(&self, link_id: &LinkId, ticket: PutTicket, error: &FieldLinkError) {
        (**self).did_fail_put(link_id, ticket, error)
    }

    fn did_fail_get(&self, link_id: &LinkId, error: &FieldLinkError) {
        (**self).did_fail_get(link_id, error)
    }

    fn did_deliver(&self, link_id: &LinkId) {
        (**self).did_deliver(link_id)
    }
}
