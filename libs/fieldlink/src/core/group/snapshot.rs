// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Assembled group values handed to subscribers.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::delegates::FieldReading;
use crate::core::meta::{Alarm, TimeStamp};
use crate::core::value::TypedValue;

/// One field's projection into a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mapping", rename_all = "snake_case")]
pub enum FieldSnapshot {
    Scalar {
        value: TypedValue,
        alarm: Alarm,
        time: TimeStamp,
    },
    Plain {
        value: TypedValue,
    },
    Any {
        value: TypedValue,
    },
    Meta {
        alarm: Alarm,
        time: TimeStamp,
    },
}

impl FieldSnapshot {
    pub fn value(&self) -> Option<&TypedValue> {
        match self {
            Self::Scalar { value, .. } | Self::Plain { value } | Self::Any { value } => Some(value),
            Self::Meta { .. } => None,
        }
    }

    pub fn alarm(&self) -> Option<&Alarm> {
        match self {
            Self::Scalar { alarm, .. } | Self::Meta { alarm, .. } => Some(alarm),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<&TimeStamp> {
        match self {
            Self::Scalar { time, .. } | Self::Meta { time, .. } => Some(time),
            _ => None,
        }
    }
}

pub(crate) type Projector = fn(FieldReading) -> FieldSnapshot;

pub(crate) fn project_scalar(reading: FieldReading) -> FieldSnapshot {
    FieldSnapshot::Scalar {
        value: reading.value,
        alarm: reading.alarm,
        time: reading.time,
    }
}

pub(crate) fn project_plain(reading: FieldReading) -> FieldSnapshot {
    FieldSnapshot::Plain {
        value: reading.value,
    }
}

pub(crate) fn project_any(reading: FieldReading) -> FieldSnapshot {
    FieldSnapshot::Any {
        value: reading.value,
    }
}

pub(crate) fn project_meta(reading: FieldReading) -> FieldSnapshot {
    FieldSnapshot::Meta {
        alarm: reading.alarm,
        time: reading.time,
    }
}

/// A coherent group value.
///
/// Update snapshots carry only the fields the change resolved to; `trigger`
/// names that change. Full snapshots carry every projected field and no trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub group: String,
    pub type_id: Option<String>,
    pub trigger: Option<String>,
    pub fields: BTreeMap<String, FieldSnapshot>,
    pub alarm: Option<Alarm>,
    pub time: Option<TimeStamp>,
}

impl GroupSnapshot {
    pub fn field(&self, name: &str) -> Option<&FieldSnapshot> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_partial(&self) -> bool {
        self.trigger.is_some()
    }
}
