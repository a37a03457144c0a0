// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::value::TypedValue;

/// Pending outbound writes keyed by sub-field path.
///
/// A later write to the same path replaces the earlier value in place, so the
/// flushed order is the order paths were first written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeferredWrites {
    entries: Vec<(String, TypedValue)>,
}

impl DeferredWrites {
    pub fn merge(&mut self, path: &str, value: TypedValue) {
        match self.entries.iter_mut().find(|(p, _)| p == path) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((path.to_string(), value)),
        }
    }

    pub fn take(&mut self) -> Vec<(String, TypedValue)> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) -> usize {
        let discarded = self.entries.len();
        self.entries.clear();
        discarded
    }
}
