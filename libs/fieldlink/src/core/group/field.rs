// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::channel_ref::ChannelRef;
use crate::core::error::{FieldLinkError, Result};
use crate::core::time_tag::TimeTagTransform;

/// How a field's value and metadata are projected into a group snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldMapping {
    /// Value, alarm and time.
    #[default]
    Scalar,
    /// Value only.
    Plain,
    /// Value wrapped as a variant.
    Any,
    /// Alarm and time only.
    Meta,
    /// No projection; writing through it requests processing.
    Proc,
}

impl FieldMapping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Plain => "plain",
            Self::Any => "any",
            Self::Meta => "meta",
            Self::Proc => "proc",
        }
    }
}

impl FromStr for FieldMapping {
    type Err = FieldLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "scalar" => Ok(Self::Scalar),
            "plain" => Ok(Self::Plain),
            "any" => Ok(Self::Any),
            "meta" => Ok(Self::Meta),
            "proc" => Ok(Self::Proc),
            other => Err(FieldLinkError::Configuration(format!(
                "unknown field mapping '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for FieldMapping {
    type Error = FieldLinkError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<FieldMapping> for String {
    fn from(mapping: FieldMapping) -> Self {
        mapping.as_str().to_string()
    }
}

impl fmt::Display for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which sibling changes mark a field dirty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerSpec {
    /// `*`: every change in the group.
    All,
    /// Empty: nothing, not even the field itself.
    None,
    /// Comma-separated sibling names.
    Fields(Vec<String>),
}

impl TriggerSpec {
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Fields(names) => names.iter().any(|n| n == name),
        }
    }
}

impl FromStr for TriggerSpec {
    type Err = FieldLinkError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "*" {
            return Ok(Self::All);
        }
        if s.is_empty() {
            return Ok(Self::None);
        }
        let mut names = Vec::new();
        for name in s.split(',').map(str::trim) {
            if name.is_empty() {
                return Err(FieldLinkError::Configuration(format!(
                    "empty name in trigger list '{}'",
                    s
                )));
            }
            if name == "*" {
                return Ok(Self::All);
            }
            names.push(name.to_string());
        }
        Ok(Self::Fields(names))
    }
}

impl TryFrom<String> for TriggerSpec {
    type Error = FieldLinkError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TriggerSpec> for String {
    fn from(spec: TriggerSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::None => Ok(()),
            Self::Fields(names) => f.write_str(&names.join(",")),
        }
    }
}

/// One field of a group as produced by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub channel: ChannelRef,
    #[serde(default)]
    pub mapping: FieldMapping,
    /// `None` means the field triggers only on itself.
    #[serde(default)]
    pub triggers: Option<TriggerSpec>,
    #[serde(default)]
    pub type_id: Option<String>,
    /// Rank for group writes. Unranked fields reject group writes.
    #[serde(default)]
    pub put_order: Option<i32>,
    #[serde(default)]
    pub time_tag: Option<TimeTagTransform>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, channel: impl Into<ChannelRef>) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            mapping: FieldMapping::default(),
            triggers: None,
            type_id: None,
            put_order: None,
            time_tag: None,
        }
    }

    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_triggers(mut self, triggers: TriggerSpec) -> Self {
        self.triggers = Some(triggers);
        self
    }

    pub fn with_type_id(mut self, type_id: impl Into<String>) -> Self {
        self.type_id = Some(type_id.into());
        self
    }

    pub fn with_put_order(mut self, rank: i32) -> Self {
        self.put_order = Some(rank);
        self
    }

    pub fn with_time_tag(mut self, transform: TimeTagTransform) -> Self {
        self.time_tag = Some(transform);
        self
    }

    /// Trigger set with the self-trigger default applied.
    pub fn effective_triggers(&self) -> TriggerSpec {
        self.triggers
            .clone()
            .unwrap_or_else(|| TriggerSpec::Fields(vec![self.name.clone()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_names() {
        assert_eq!("".parse::<FieldMapping>().unwrap(), FieldMapping::Scalar);
        assert_eq!("meta".parse::<FieldMapping>().unwrap(), FieldMapping::Meta);
        assert_eq!(" proc ".parse::<FieldMapping>().unwrap(), FieldMapping::Proc);
        assert!("structure".parse::<FieldMapping>().is_err());
    }

    #[test]
    fn test_trigger_spec_forms() {
        assert_eq!("*".parse::<TriggerSpec>().unwrap(), TriggerSpec::All);
        assert_eq!("".parse::<TriggerSpec>().unwrap(), TriggerSpec::None);
        assert_eq!(
            "a, b".parse::<TriggerSpec>().unwrap(),
            TriggerSpec::fields(["a", "b"])
        );
        assert!("a,,b".parse::<TriggerSpec>().is_err());
    }

    #[test]
    fn test_default_trigger_is_self() {
        let field = FieldDefinition::new("A", "rec:A");
        assert_eq!(field.effective_triggers(), TriggerSpec::fields(["A"]));
    }

    #[test]
    fn test_field_definition_from_json() {
        let field: FieldDefinition = serde_json::from_str(
            r#"{"name":"B","channel":"rec:B","mapping":"plain","triggers":"A","put_order":2}"#,
        )
        .unwrap();
        assert_eq!(field.mapping, FieldMapping::Plain);
        assert_eq!(field.triggers, Some(TriggerSpec::fields(["A"])));
        assert_eq!(field.put_order, Some(2));
        assert_eq!(field.channel.as_str(), "rec:B");
    }
}
