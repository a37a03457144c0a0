// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::field::FieldDefinition;

fn default_atomic() -> bool {
    true
}

/// A group as produced by configuration, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    #[serde(default)]
    pub type_id: Option<String>,
    /// Build snapshots under one lock spanning every field.
    #[serde(default = "default_atomic")]
    pub atomic: bool,
    /// Aggregate a group-level alarm and time from the fields read.
    #[serde(default)]
    pub propagate_meta: bool,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl GroupDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: None,
            atomic: default_atomic(),
            propagate_meta: false,
            fields: Vec::new(),
        }
    }

    pub fn with_type_id(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = Some(type_id.into());
        self
    }

    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn with_meta_propagation(mut self, propagate: bool) -> Self {
        self.propagate_meta = propagate;
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}
