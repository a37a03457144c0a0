// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Opaque handle into field storage (for example `"rec:X.VAL"`).
///
/// Cloning is a reference-count bump.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChannelRef(Arc<str>);

impl ChannelRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ChannelRef {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for ChannelRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ChannelRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChannelRef {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for ChannelRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ChannelRef> for String {
    fn from(channel: ChannelRef) -> Self {
        channel.0.to_string()
    }
}

impl PartialEq<str> for ChannelRef {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ChannelRef {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}
