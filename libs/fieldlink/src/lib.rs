// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Field aggregation and remote link engine.
//!
//! Groups turn independent field writes into coherent snapshots delivered
//! through bounded monitor queues. Links bind local fields to remote values
//! with their own connection lifecycle, deferred writes and processing order.
//! Field storage and the wire transport are supplied by the embedder through
//! the delegate traits in [`core::delegates`].

#![allow(clippy::type_complexity)] // Complex types are clear in context

// Re-export crossbeam_channel so embedders can select on monitor wakeups
pub use crossbeam_channel;

pub mod core;

pub use core::*;
