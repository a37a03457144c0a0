// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

use crate::core::value::ScalarType;

#[derive(Error, Debug)]
pub enum FieldLinkError {
    /// A `TypedValue` was read at the wrong tag, or converted out of the nil state.
    #[error("bad cast: expected {expected}, found {}", found.map(|t| t.to_string()).unwrap_or_else(|| "(nil)".to_string()))]
    BadCast {
        expected: ScalarType,
        found: Option<ScalarType>,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Link disconnected: {0}")]
    LinkDisconnected(String),

    #[error("Link closed: {0}")]
    LinkClosed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Put not allowed: {0}")]
    PutNotAllowed(String),

    #[error("Monitor queue closed: {0}")]
    QueueClosed(String),

    #[error("Field storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FieldLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_cast_message_names_nil() {
        let err = FieldLinkError::BadCast {
            expected: ScalarType::Int32,
            found: None,
        };
        assert_eq!(err.to_string(), "bad cast: expected int, found (nil)");
    }

    #[test]
    fn test_bad_cast_message_names_found_tag() {
        let err = FieldLinkError::BadCast {
            expected: ScalarType::Float64,
            found: Some(ScalarType::String),
        };
        assert_eq!(err.to_string(), "bad cast: expected double, found string");
    }
}
