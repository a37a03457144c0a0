// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// Requested monitor queue depth. The engine may clamp it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueDepth(usize);

impl Default for QueueDepth {
    fn default() -> Self {
        QueueDepth(4)
    }
}

impl QueueDepth {
    pub fn get(&self) -> usize {
        self.0
    }

    /// Clamp into `1..=max`.
    pub fn clamped(&self, max: usize) -> QueueDepth {
        QueueDepth(self.0.clamp(1, max.max(1)))
    }
}

impl From<usize> for QueueDepth {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for QueueDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
