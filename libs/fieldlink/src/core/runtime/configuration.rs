// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! A batch of group and link descriptors installed as one unit.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::core::channel_ref::ChannelRef;
use crate::core::error::{FieldLinkError, Result};
use crate::core::group::{Group, GroupDefinition};
use crate::core::links::LinkSpec;

/// A link together with the local field it drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDefinition {
    pub local: ChannelRef,
    #[serde(flatten)]
    pub spec: LinkSpec,
}

impl LinkDefinition {
    pub fn new(local: impl Into<ChannelRef>, spec: LinkSpec) -> Self {
        Self {
            local: local.into(),
            spec,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfiguration {
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,
    #[serde(default)]
    pub links: Vec<LinkDefinition>,
}

impl EngineConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: GroupDefinition) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_link(mut self, link: LinkDefinition) -> Self {
        self.links.push(link);
        self
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| FieldLinkError::Configuration(format!("Failed to parse configuration: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| FieldLinkError::Configuration(format!("Failed to parse configuration: {}", e)))
    }

    /// Load a YAML (or, by `.json` extension, JSON) configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FieldLinkError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        tracing::info!(
            "Loaded {} groups and {} links from {}",
            config.groups.len(),
            config.links.len(),
            path.display()
        );
        Ok(config)
    }

    /// Validate every descriptor and build the groups. Nothing is installed.
    pub(crate) fn build_groups(&self) -> Result<Vec<Group>> {
        let mut names = HashSet::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        for definition in &self.groups {
            if !names.insert(definition.name.as_str()) {
                return Err(FieldLinkError::Configuration(format!(
                    "group '{}' defined more than once",
                    definition.name
                )));
            }
            groups.push(Group::build(definition.clone())?);
        }
        for link in &self.links {
            link.spec.validate()?;
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::links::ProcRequest;

    const YAML: &str = r#"
groups:
  - name: grp
    type_id: "epics:nt/NTTable:1.0"
    fields:
      - name: A
        channel: "rec:A"
        triggers: "*"
      - name: B
        channel: "rec:B"
        mapping: plain
        triggers: "A"
links:
  - local: "rec:L.INP"
    pv: "remote:X"
    proc: CP
    monorder: -1
"#;

    #[test]
    fn test_parse_yaml() {
        let config = EngineConfiguration::from_yaml_str(YAML).unwrap();
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.links[0].local.as_str(), "rec:L.INP");
        assert_eq!(config.links[0].spec.proc, ProcRequest::Force);
        assert_eq!(config.links[0].spec.monorder, -1);
        assert_eq!(config.build_groups().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let config = EngineConfiguration::new()
            .with_group(GroupDefinition::new("g"))
            .with_group(GroupDefinition::new("g"));
        assert!(matches!(
            config.build_groups(),
            Err(FieldLinkError::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_link_rejected() {
        let config =
            EngineConfiguration::new().with_link(LinkDefinition::new("rec:L", LinkSpec::new("")));
        assert!(config.build_groups().is_err());
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"groups":[{"name":"g","fields":[{"name":"A","channel":"rec:A"}]}]}"#,
        )
        .unwrap();
        let config = EngineConfiguration::load(&path).unwrap();
        assert_eq!(config.groups[0].fields[0].name, "A");
    }
}
