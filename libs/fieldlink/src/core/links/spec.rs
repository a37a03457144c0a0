// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Link descriptors as produced by configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{FieldLinkError, Result};
use crate::core::meta::{Alarm, Severity};
use crate::core::monitor::QueueDepth;
use crate::core::time_tag::TimeTagTransform;

/// Processing request mode of a link.
///
/// An empty mode string means the default, `IfPassive`, same as leaving the
/// key out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProcRequest {
    /// Leave the decision to the other side.
    None,
    /// Never process.
    Skip,
    /// Always process.
    Force,
    /// Inbound: process only if the local field's scheduling allows it.
    /// Outbound: same as `Force`.
    #[default]
    IfPassive,
}

/// Processing instruction attached to an outbound put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteProcessing {
    Default,
    Process,
    NoProcess,
}

impl ProcRequest {
    pub fn outbound(&self) -> RemoteProcessing {
        match self {
            Self::None => RemoteProcessing::Default,
            Self::Skip => RemoteProcessing::NoProcess,
            Self::Force | Self::IfPassive => RemoteProcessing::Process,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Skip => "NPP",
            Self::Force => "CP",
            Self::IfPassive => "PP",
        }
    }
}

impl FromStr for ProcRequest {
    type Err = FieldLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "none" => Ok(Self::None),
            "false" | "NPP" => Ok(Self::Skip),
            "true" | "CP" => Ok(Self::Force),
            "" | "PP" | "CPP" => Ok(Self::IfPassive),
            other => Err(FieldLinkError::Configuration(format!(
                "unknown link proc mode '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ProcRequest {
    type Error = FieldLinkError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ProcRequest> for String {
    fn from(mode: ProcRequest) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ProcRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity propagation mode of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SevrMode {
    #[default]
    Off,
    On,
    OnlyIfInvalid,
}

impl SevrMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "NMS",
            Self::On => "MS",
            Self::OnlyIfInvalid => "MSI",
        }
    }

    /// Alarm the local field should be raised to, if any.
    ///
    /// Severity is maximized, so a remote alarm never lowers the local one.
    pub fn propagate(&self, local: &Alarm, remote: &Alarm) -> Option<Alarm> {
        let applies = match self {
            Self::Off => false,
            Self::On => true,
            Self::OnlyIfInvalid => remote.severity == Severity::WORST,
        };
        if applies && remote.severity > local.severity {
            Some(Alarm {
                severity: local.severity.maximize(remote.severity),
                status: remote.status,
                message: remote.message.clone(),
            })
        } else {
            None
        }
    }
}

impl FromStr for SevrMode {
    type Err = FieldLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "false" | "NMS" => Ok(Self::Off),
            "true" | "MS" => Ok(Self::On),
            "MSI" => Ok(Self::OnlyIfInvalid),
            other => Err(FieldLinkError::Configuration(format!(
                "unknown link sevr mode '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SevrMode {
    type Error = FieldLinkError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SevrMode> for String {
    fn from(mode: SevrMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for SevrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of one shared remote subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    pub target: String,
    pub queue_depth: QueueDepth,
    pub pipeline: bool,
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q={}", self.target, self.queue_depth)?;
        if self.pipeline {
            f.write_str(" pipeline")?;
        }
        Ok(())
    }
}

/// Binding from a local field to a remote value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Remote value name.
    #[serde(alias = "pv")]
    pub target: String,
    /// Sub-field of the remote value. Empty selects the value itself.
    #[serde(default)]
    pub field: String,
    #[serde(default, alias = "Q")]
    pub queue_depth: QueueDepth,
    #[serde(default)]
    pub proc: ProcRequest,
    #[serde(default)]
    pub sevr: SevrMode,
    #[serde(default)]
    pub monorder: i32,
    #[serde(default)]
    pub defer: bool,
    #[serde(default)]
    pub pipeline: bool,
    #[serde(default)]
    pub time_tag: Option<TimeTagTransform>,
}

impl LinkSpec {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            field: String::new(),
            queue_depth: QueueDepth::default(),
            proc: ProcRequest::default(),
            sevr: SevrMode::default(),
            monorder: 0,
            defer: false,
            pipeline: false,
            time_tag: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_queue_depth(mut self, depth: impl Into<QueueDepth>) -> Self {
        self.queue_depth = depth.into();
        self
    }

    pub fn with_proc(mut self, proc: ProcRequest) -> Self {
        self.proc = proc;
        self
    }

    pub fn with_sevr(mut self, sevr: SevrMode) -> Self {
        self.sevr = sevr;
        self
    }

    pub fn with_monorder(mut self, monorder: i32) -> Self {
        self.monorder = monorder;
        self
    }

    pub fn with_defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }

    pub fn with_pipeline(mut self, pipeline: bool) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_time_tag(mut self, transform: TimeTagTransform) -> Self {
        self.time_tag = Some(transform);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(FieldLinkError::Configuration(
                "link target must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn channel_key(&self) -> ChannelKey {
        ChannelKey {
            target: self.target.clone(),
            queue_depth: self.queue_depth,
            pipeline: self.pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proc_aliases() {
        assert_eq!("NPP".parse::<ProcRequest>().unwrap(), ProcRequest::Skip);
        assert_eq!("false".parse::<ProcRequest>().unwrap(), ProcRequest::Skip);
        assert_eq!("true".parse::<ProcRequest>().unwrap(), ProcRequest::Force);
        assert_eq!("CP".parse::<ProcRequest>().unwrap(), ProcRequest::Force);
        assert_eq!("CPP".parse::<ProcRequest>().unwrap(), ProcRequest::IfPassive);
        assert_eq!("none".parse::<ProcRequest>().unwrap(), ProcRequest::None);
        assert!("sometimes".parse::<ProcRequest>().is_err());
        assert_eq!(ProcRequest::IfPassive.outbound(), RemoteProcessing::Process);
    }

    #[test]
    fn test_empty_proc_matches_missing_key() {
        assert_eq!("".parse::<ProcRequest>().unwrap(), ProcRequest::default());
        let empty: LinkSpec = serde_yaml::from_str("target: remote:X\nproc: \"\"\n").unwrap();
        let missing: LinkSpec = serde_yaml::from_str("target: remote:X\n").unwrap();
        assert_eq!(empty.proc, ProcRequest::IfPassive);
        assert_eq!(empty.proc, missing.proc);
    }

    #[test]
    fn test_sevr_aliases() {
        assert_eq!("MS".parse::<SevrMode>().unwrap(), SevrMode::On);
        assert_eq!("true".parse::<SevrMode>().unwrap(), SevrMode::On);
        assert_eq!("MSI".parse::<SevrMode>().unwrap(), SevrMode::OnlyIfInvalid);
        assert_eq!("NMS".parse::<SevrMode>().unwrap(), SevrMode::Off);
    }

    #[test]
    fn test_sevr_propagation() {
        let local = Alarm::new(Severity::Minor, "local");
        let major = Alarm::new(Severity::Major, "remote");
        let invalid = Alarm::new(Severity::Invalid, "gone");

        assert!(SevrMode::Off.propagate(&local, &invalid).is_none());
        assert_eq!(
            SevrMode::On.propagate(&local, &major).map(|a| a.severity),
            Some(Severity::Major)
        );
        assert!(SevrMode::On.propagate(&major, &local).is_none());
        assert!(SevrMode::OnlyIfInvalid.propagate(&local, &major).is_none());
        assert_eq!(
            SevrMode::OnlyIfInvalid
                .propagate(&local, &invalid)
                .map(|a| a.severity),
            Some(Severity::Invalid)
        );
    }

    #[test]
    fn test_link_spec_from_json() {
        let spec: LinkSpec = serde_json::from_str(
            r#"{"pv":"remote:X","field":"a.b","Q":2,"proc":"CP","sevr":"MSI","monorder":-1,"defer":true}"#,
        )
        .unwrap();
        assert_eq!(spec.target, "remote:X");
        assert_eq!(spec.queue_depth.get(), 2);
        assert_eq!(spec.proc, ProcRequest::Force);
        assert_eq!(spec.sevr, SevrMode::OnlyIfInvalid);
        assert_eq!(spec.monorder, -1);
        assert!(spec.defer);
        assert!(!spec.pipeline);
    }

    #[test]
    fn test_channel_key_shared_by_same_target() {
        let a = LinkSpec::new("remote:X").with_monorder(1);
        let b = LinkSpec::new("remote:X").with_field("sub");
        let c = LinkSpec::new("remote:X").with_pipeline(true);
        assert_eq!(a.channel_key(), b.channel_key());
        assert_ne!(a.channel_key(), c.channel_key());
    }

    #[test]
    fn test_empty_target_rejected() {
        assert!(LinkSpec::new(" ").validate().is_err());
    }
}
