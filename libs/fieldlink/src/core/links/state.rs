// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sub-state while a link is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectedState {
    #[default]
    Idle,
    PutPending,
    GetPending,
}

/// Connection state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected(ConnectedState),
    /// Torn down; never leaves this state.
    Closed,
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected(ConnectedState::Idle) => write!(f, "Connected/Idle"),
            Self::Connected(ConnectedState::PutPending) => write!(f, "Connected/PutPending"),
            Self::Connected(ConnectedState::GetPending) => write!(f, "Connected/GetPending"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Connection signal reported by the transport for one remote channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// Reconnect attempt started.
    Connecting,
    /// Remote path resolved.
    Connected,
    /// Connection lost or resolution failed.
    Disconnected,
}
