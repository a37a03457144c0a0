// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Field storage delegate: the source of raw values and processing.

use std::sync::Arc;

use crate::core::channel_ref::ChannelRef;
use crate::core::error::Result;
use crate::core::meta::{Alarm, TimeStamp};
use crate::core::value::TypedValue;

/// Current value and metadata of one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldReading {
    pub value: TypedValue,
    pub alarm: Alarm,
    pub time: TimeStamp,
}

impl FieldReading {
    pub fn new(value: impl Into<TypedValue>, alarm: Alarm, time: TimeStamp) -> Self {
        Self {
            value: value.into(),
            alarm,
            time,
        }
    }
}

/// What kind of processing a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingReason {
    /// A group write went through a `proc` field or a ranked field.
    GroupPut,
    /// A remote update arrived on a link.
    LinkUpdate,
}

/// Hint passed along with a processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessingHint {
    pub reason: ProcessingReason,
    /// Rank the request was issued at (`monorder` or `put_order`).
    pub order: i32,
}

/// Delegate for the record/field storage that owns field values.
///
/// Engine operations call into this from whichever thread reported the
/// change, so implementations must be `Send + Sync`.
pub trait FieldStorageDelegate: Send + Sync {
    /// Read the current value, alarm, and time of a field.
    fn read(&self, channel: &ChannelRef) -> Result<FieldReading>;

    /// Write a value to a field.
    fn write(&self, channel: &ChannelRef, value: &TypedValue) -> Result<()>;

    /// Raise the field's alarm to `alarm`. Used for link severity propagation.
    fn raise_alarm(&self, _channel: &ChannelRef, _alarm: &Alarm) -> Result<()> {
        Ok(())
    }

    /// Ask for the field's owner to be scheduled for processing.
    fn request_processing(&self, channel: &ChannelRef, hint: ProcessingHint) -> Result<()>;

    /// Whether the field's own scheduling policy lets remote updates process it.
    fn allows_passive_processing(&self, _channel: &ChannelRef) -> bool {
        true
    }

    /// Run `body` with every listed channel locked at once.
    ///
    /// Storage that has its own record locks overrides this so an atomic group
    /// snapshot sees one consistent instant.
    fn with_channels_locked(&self, _channels: &[ChannelRef], body: &mut dyn FnMut()) {
        body()
    }
}

// =============================================================================
// Blanket implementation for Arc wrapper
// =============================================================================

impl FieldStorageDelegate for Arc<dyn FieldStorageDelegate> {
    fn read(&self, channel: &ChannelRef) -> Result<FieldReading> {
        (**self).read(channel)
    }

    fn write(&self, channel: &ChannelRef, value: &TypedValue) -> Result<()> {
        (**self).write(channel, value)
    }

    fn raise_alarm(&self, channel: &ChannelRef, alarm: &Alarm) -> Result<()> {
        (**self).raise_alarm(channel, alarm)
    }

    fn request_processing(&self, channel: &ChannelRef, hint: ProcessingHint) -> Result<()> {
        (**self).request_processing(channel, hint)
    }

    fn allows_passive_processing(&self, channel: &ChannelRef) -> bool {
        (**self).allows_passive_processing(channel)
    }

    fn with_channels_locked(&self, channels: &[ChannelRef], body: &mut dyn FnMut()) {
        (**self).with_channels_locked(channels, body)
    }
}
