// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Transport delegate: moves link traffic to and from remote values.
//!
//! Every call must return without waiting on the network. Completions come
//! back through the engine's callbacks (`connection_changed`,
//! `remote_value_received`, `put_completed`).

use std::sync::Arc;

use crate::core::error::Result;
use crate::core::links::{ChannelKey, LinkId, PutTicket, RemoteProcessing};
use crate::core::value::TypedValue;

/// Request to open a subscription for one remote channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub key: ChannelKey,
    /// Resolve against the local provider only.
    pub local_only: bool,
}

/// One outbound write covering one or more sub-fields of the target.
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub link: LinkId,
    pub ticket: PutTicket,
    pub target: String,
    /// `(sub-field path, value)` pairs; an empty path addresses the value itself.
    pub fields: Vec<(String, TypedValue)>,
    pub process: RemoteProcessing,
}

pub trait TransportDelegate: Send + Sync {
    fn connect(&self, request: &ConnectRequest) -> Result<()>;

    fn disconnect(&self, key: &ChannelKey) -> Result<()>;

    fn put(&self, request: PutRequest) -> Result<()>;
}

impl TransportDelegate for Arc<dyn TransportDelegate> {
    fn connect(&self, request: &ConnectRequest) -> Result<()> {
        (**self).connect(request)
    }

    fn disconnect(&self, key: &ChannelKey) -> Result<()> {
        (**self).disconnect(key)
    }

    fn put(&self, request: PutRequest) -> Result<()> {
        (**self).put(request)
    }
}
