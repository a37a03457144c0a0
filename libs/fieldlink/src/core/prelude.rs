// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Common imports for engine users and collaborator implementations.

pub use crate::core::channel_ref::ChannelRef;
pub use crate::core::config::EngineConfig;
pub use crate::core::delegates::{
    ConnectRequest, FieldReading, FieldStorageDelegate, LinkDelegate, ProcessingHint, PutRequest,
    TransportDelegate,
};
pub use crate::core::error::{FieldLinkError, Result};
pub use crate::core::group::{
    FieldDefinition, FieldMapping, FieldSnapshot, GroupDefinition, GroupSnapshot, TriggerSpec,
};
pub use crate::core::links::{
    ChannelKey, ConnectionEvent, LinkId, LinkSpec, LinkState, ProcRequest, PutTicket,
    RemoteUpdate, SevrMode,
};
pub use crate::core::meta::{Alarm, Severity, TimeStamp};
pub use crate::core::monitor::{FlowControl, QueueDepth};
pub use crate::core::runtime::{Engine, EngineBuilder, EngineConfiguration, LinkDefinition};
pub use crate::core::time_tag::TimeTagTransform;
pub use crate::core::value::TypedValue;
