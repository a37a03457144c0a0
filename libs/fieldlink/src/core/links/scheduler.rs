// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Ordering of link-driven processing requests.
//!
//! Entries are kept sorted by ascending `(rank, registration)`, so equal
//! `monorder` ranks fall back to link registration order. This governs only
//! the order requests are issued in, not how storage schedules them.

#[derive(Debug, Clone)]
struct Ranked<T> {
    rank: i32,
    registration: u64,
    item: T,
}

#[derive(Debug, Clone)]
pub struct ProcessingOrder<T> {
    entries: Vec<Ranked<T>>,
}

impl<T> Default for ProcessingOrder<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ProcessingOrder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every entry ordered at or before `(rank, registration)`.
    pub fn insert(&mut self, rank: i32, registration: u64, item: T) {
        let at = self
            .entries
            .partition_point(|e| (e.rank, e.registration) <= (rank, registration));
        self.entries.insert(
            at,
            Ranked {
                rank,
                registration,
                item,
            },
        );
    }

    /// Remove the first entry matching `pred`.
    pub fn remove_by(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        let at = self.entries.iter().position(|e| pred(&e.item))?;
        Some(self.entries.remove(at).item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every entry in processing order.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.entries.drain(..).map(|e| e.item)
    }
}

impl<T: Clone> ProcessingOrder<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
