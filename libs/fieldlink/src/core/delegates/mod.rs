// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Delegate traits for the engine's external collaborators.
//!
//! Delegates cover:
//! - Field storage: reads, writes, processing requests, multi-channel locking
//! - Transport: connect/disconnect/put for remote links
//! - Link: lifecycle callbacks (connect, disconnect, failures)

mod field_storage;
mod link;
mod transport;

pub use field_storage::{FieldReading, FieldStorageDelegate, ProcessingHint, ProcessingReason};
pub use link::{DefaultLinkDelegate, LinkDelegate};
pub use transport::{ConnectRequest, PutRequest, TransportDelegate};
