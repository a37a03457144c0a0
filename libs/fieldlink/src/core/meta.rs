// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Alarm and time metadata carried alongside field values.

use serde::{Deserialize, Serialize};

/// Alarm severity, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    NoAlarm,
    Minor,
    Major,
    Invalid,
}

impl Severity {
    /// Worst defined level.
    pub const WORST: Severity = Severity::Invalid;

    pub fn maximize(self, other: Severity) -> Severity {
        self.max(other)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAlarm => write!(f, "NO_ALARM"),
            Self::Minor => write!(f, "MINOR"),
            Self::Major => write!(f, "MAJOR"),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alarm {
    pub severity: Severity,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

impl Alarm {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            status: 0,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimeStamp {
    pub seconds_past_epoch: i64,
    pub nanoseconds: u32,
    #[serde(default)]
    pub user_tag: u32,
}

impl TimeStamp {
    pub fn new(seconds_past_epoch: i64, nanoseconds: u32) -> Self {
        Self {
            seconds_past_epoch,
            nanoseconds,
            user_tag: 0,
        }
    }

    pub fn is_later_than(&self, other: &TimeStamp) -> bool {
        (self.seconds_past_epoch, self.nanoseconds) > (other.seconds_past_epoch, other.nanoseconds)
    }
}

/// Worst alarm and latest time over a set of field metadata.
///
/// Ties on severity keep the first alarm seen.
pub fn reduce_meta<'a, I>(items: I) -> Option<(Alarm, TimeStamp)>
where
    I: IntoIterator<Item = (&'a Alarm, &'a TimeStamp)>,
{
    let mut reduced: Option<(Alarm, TimeStamp)> = None;
    for (alarm, time) in items {
        match reduced.as_mut() {
            None => reduced = Some((alarm.clone(), *time)),
            Some((worst, latest)) => {
                if alarm.severity > worst.severity {
                    *worst = alarm.clone();
                }
                if time.is_later_than(latest) {
                    *latest = *time;
                }
            }
        }
    }
    reduced
}
