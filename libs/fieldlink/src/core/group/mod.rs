// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Group model and the atomic update engine.

mod definition;
mod field;
mod group;
mod snapshot;
mod update_engine;

pub use definition::GroupDefinition;
pub use field::{FieldDefinition, FieldMapping, TriggerSpec};
pub use group::Group;
pub use snapshot::{FieldSnapshot, GroupSnapshot};
pub use update_engine::{GroupQueue, GroupRuntime, GroupSubscription};
