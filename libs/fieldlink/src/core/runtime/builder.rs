// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Builder pattern for [`Engine`] configuration.

use std::sync::Arc;

use crate::core::config::EngineConfig;
use crate::core::delegates::{
    DefaultLinkDelegate, FieldStorageDelegate, LinkDelegate, TransportDelegate,
};
use crate::core::error::{FieldLinkError, Result};

use super::Engine;

/// Builder for configuring and constructing an [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    storage: Option<Arc<dyn FieldStorageDelegate>>,
    transport: Option<Arc<dyn TransportDelegate>>,
    link_delegate: Option<Arc<dyn LinkDelegate>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Create a new builder with the default config and no delegates.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            storage: None,
            transport: None,
            link_delegate: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the field storage delegate.
    pub fn with_field_storage<S: FieldStorageDelegate + 'static>(mut self, storage: S) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Set the field storage delegate from an Arc.
    pub fn with_field_storage_arc(mut self, storage: Arc<dyn FieldStorageDelegate>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the transport delegate.
    pub fn with_transport<T: TransportDelegate + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the transport delegate from an Arc.
    pub fn with_transport_arc(mut self, transport: Arc<dyn TransportDelegate>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set a custom link delegate.
    pub fn with_link_delegate<L: LinkDelegate + 'static>(mut self, delegate: L) -> Self {
        self.link_delegate = Some(Arc::new(delegate));
        self
    }

    /// Set a custom link delegate from an Arc.
    pub fn with_link_delegate_arc(mut self, delegate: Arc<dyn LinkDelegate>) -> Self {
        self.link_delegate = Some(delegate);
        self
    }

    /// Build the engine. Field storage and transport are required.
    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;
        let storage = self.storage.ok_or_else(|| {
            FieldLinkError::Configuration("engine needs a field storage delegate".into())
        })?;
        let transport = self.transport.ok_or_else(|| {
            FieldLinkError::Configuration("engine needs a transport delegate".into())
        })?;
        let link_delegate = self
            .link_delegate
            .unwrap_or_else(|| Arc::new(DefaultLinkDelegate));

        Ok(Engine::new(self.config, storage, transport, link_delegate))
    }
}
