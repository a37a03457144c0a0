// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Validated group with its trigger resolution and action tables.

use std::collections::{BTreeSet, HashMap};

use super::definition::GroupDefinition;
use super::field::{FieldDefinition, FieldMapping, TriggerSpec};
use super::snapshot::{Projector, project_any, project_meta, project_plain, project_scalar};
use crate::core::channel_ref::ChannelRef;
use crate::core::error::{FieldLinkError, Result};

/// What an update does with one participating field, fixed at build time.
#[derive(Clone, Copy)]
pub(crate) enum FieldAction {
    Project(Projector),
    Process,
}

impl FieldAction {
    fn for_mapping(mapping: FieldMapping) -> Self {
        match mapping {
            FieldMapping::Scalar => Self::Project(project_scalar),
            FieldMapping::Plain => Self::Project(project_plain),
            FieldMapping::Any => Self::Project(project_any),
            FieldMapping::Meta => Self::Project(project_meta),
            FieldMapping::Proc => Self::Process,
        }
    }
}

impl std::fmt::Debug for FieldAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(_) => f.write_str("Project"),
            Self::Process => f.write_str("Process"),
        }
    }
}

/// An immutable, validated group.
#[derive(Debug)]
pub struct Group {
    definition: GroupDefinition,
    index: HashMap<String, usize>,
    actions: Vec<FieldAction>,
    /// Field indices whose snapshot entries a change to field `i` refreshes.
    participants: Vec<Vec<usize>>,
    /// Indices of ranked fields, sorted by `(rank, position)`.
    put_plan: Vec<usize>,
}

impl Group {
    /// Validate a definition and precompute its tables.
    ///
    /// Fails on an empty or duplicate field name, or on a trigger naming a
    /// field that is not in the group.
    pub fn build(definition: GroupDefinition) -> Result<Self> {
        if definition.name.trim().is_empty() {
            return Err(FieldLinkError::Configuration(
                "group name must not be empty".into(),
            ));
        }

        let mut index = HashMap::with_capacity(definition.fields.len());
        for (i, field) in definition.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(FieldLinkError::Configuration(format!(
                    "group '{}' has a field with an empty name",
                    definition.name
                )));
            }
            if index.insert(field.name.clone(), i).is_some() {
                return Err(FieldLinkError::Configuration(format!(
                    "group '{}' defines field '{}' more than once",
                    definition.name, field.name
                )));
            }
        }

        let triggers: Vec<TriggerSpec> = definition
            .fields
            .iter()
            .map(FieldDefinition::effective_triggers)
            .collect();
        for (field, spec) in definition.fields.iter().zip(&triggers) {
            if let TriggerSpec::Fields(names) = spec {
                if let Some(unknown) = names.iter().find(|n| !index.contains_key(n.as_str())) {
                    return Err(FieldLinkError::Configuration(format!(
                        "group '{}' field '{}' triggers on unknown field '{}'",
                        definition.name, field.name, unknown
                    )));
                }
            }
        }

        let participants = resolve_participants(&definition.fields, &triggers);
        let actions = definition
            .fields
            .iter()
            .map(|f| FieldAction::for_mapping(f.mapping))
            .collect();

        let mut put_plan: Vec<usize> = definition
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.put_order.is_some())
            .map(|(i, _)| i)
            .collect();
        put_plan.sort_by_key(|&i| (definition.fields[i].put_order, i));

        tracing::debug!(
            "[{}] built group with {} fields",
            definition.name,
            definition.fields.len()
        );

        Ok(Self {
            definition,
            index,
            actions,
            participants,
            put_plan,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn type_id(&self) -> Option<&str> {
        self.definition.type_id.as_deref()
    }

    pub fn is_atomic(&self) -> bool {
        self.definition.atomic
    }

    pub fn propagates_meta(&self) -> bool {
        self.definition.propagate_meta
    }

    pub fn definition(&self) -> &GroupDefinition {
        &self.definition
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.definition.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&i| &self.definition.fields[i])
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Names of the fields a change to `name` puts into the next snapshot.
    ///
    /// Empty for a suppressed change or an unknown name.
    pub fn resolve_trigger(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&i| {
                self.participants[i]
                    .iter()
                    .map(|&p| self.definition.fields[p].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn participants(&self, index: usize) -> &[usize] {
        self.participants.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn action(&self, index: usize) -> FieldAction {
        self.actions[index]
    }

    pub(crate) fn put_plan(&self) -> &[usize] {
        &self.put_plan
    }

    /// Field indices that project a value, in definition order.
    pub(crate) fn projected(&self) -> Vec<usize> {
        (0..self.actions.len())
            .filter(|&i| matches!(self.actions[i], FieldAction::Project(_)))
            .collect()
    }

    /// Storage channels read for the given fields.
    pub(crate) fn channels_of(&self, indices: &[usize]) -> Vec<ChannelRef> {
        indices
            .iter()
            .map(|&i| self.definition.fields[i].channel.clone())
            .collect()
    }
}

/// A change to `X` is suppressed unless `X` triggers on itself (directly or
/// through `*`). Otherwise it refreshes `X` plus every field whose trigger set
/// names `X` or is `*`. `proc` fields never appear in a snapshot.
fn resolve_participants(fields: &[FieldDefinition], triggers: &[TriggerSpec]) -> Vec<Vec<usize>> {
    fields
        .iter()
        .enumerate()
        .map(|(x, changed)| {
            if !triggers[x].contains(&changed.name) {
                return Vec::new();
            }
            let mut set = BTreeSet::new();
            set.insert(x);
            for (f, spec) in triggers.iter().enumerate() {
                if spec.contains(&changed.name) {
                    set.insert(f);
                }
            }
            set.into_iter()
                .filter(|&f| fields[f].mapping != FieldMapping::Proc)
                .collect()
        })
        .collect()
}
