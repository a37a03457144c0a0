// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Engine-wide configuration via `fieldlink.yaml`.

use crate::core::error::{FieldLinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_queue_depth() -> usize {
    4
}

fn default_max_queue_depth() -> usize {
    1024
}

/// Process-wide engine settings, passed explicitly to the engine builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Link debug level (0..=5). At 3 and above link transitions log at `debug`.
    #[serde(default)]
    pub link_debug: u8,

    /// Resolve link targets against the local provider only.
    #[serde(default)]
    pub isolate: bool,

    /// Depth for group subscriptions that don't request one.
    #[serde(default = "default_queue_depth")]
    pub default_queue_depth: usize,

    /// Upper clamp for any requested queue depth.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            link_debug: 0,
            isolate: false,
            default_queue_depth: default_queue_depth(),
            max_queue_depth: default_max_queue_depth(),
        }
    }
}

impl EngineConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "fieldlink.yaml";

    /// Level at which per-link transitions are logged at `debug`.
    pub const VERBOSE_LINK_DEBUG: u8 = 3;

    pub fn verbose_links(&self) -> bool {
        self.link_debug >= Self::VERBOSE_LINK_DEBUG
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_queue_depth == 0 {
            return Err(FieldLinkError::Configuration(
                "max_queue_depth must be at least 1".into(),
            ));
        }
        if self.link_debug > 5 {
            return Err(FieldLinkError::Configuration(format!(
                "link_debug {} out of range 0..=5",
                self.link_debug
            )));
        }
        Ok(())
    }

    /// Load configuration from a directory. Returns error if the file is
    /// missing, cannot be parsed, or fails validation.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            FieldLinkError::Configuration(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            FieldLinkError::Configuration(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
        config.validate()?;

        tracing::info!("Loaded engine config from {}", config_path.display());
        Ok(config)
    }

    /// Load configuration from a directory, returning defaults if the file is
    /// missing or unusable.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(
                "No {} found in {}, using defaults",
                Self::FILE_NAME,
                dir.display()
            );
            return Self::default();
        }

        match Self::load(dir) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_queue_depth, 4);
        assert_eq!(config.max_queue_depth, 1024);
        assert!(!config.isolate);
        assert!(!config.verbose_links());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: EngineConfig = serde_yaml::from_str("link_debug: 3\nisolate: true\n").unwrap();
        assert!(config.verbose_links());
        assert!(config.isolate);
        assert_eq!(config.max_queue_depth, 1024);
    }

    #[test]
    fn test_validate_rejects_zero_max_depth() {
        let config = EngineConfig {
            max_queue_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
