//! Function input: the sequencing rules and the knobs that shape evaluation.
//!
//! The input is a KRM-like object (`sequencer.fn.crossplane.io/v1beta1`,
//! kind `Input`) embedded in the request. It is never installed as a CRD.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SequencerError};
use crate::ResourceName;

pub const INPUT_API_VERSION: &str = "sequencer.fn.crossplane.io/v1beta1";
pub const INPUT_KIND: &str = "Input";

/// Which Usage API to emit when deletion sequencing is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageVersion {
    /// `apiextensions.crossplane.io` Usage; cluster-scoped resources only.
    #[serde(rename = "v1", alias = "legacy")]
    V1,
    /// `protection.crossplane.io` Usage / ClusterUsage.
    #[default]
    #[serde(rename = "v2", alias = "current")]
    V2,
}

/// An ordered list of composed resource names or patterns.
/// Each entry waits for every entry before it to be ready.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencingRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequence: Vec<ResourceName>,
}

impl SequencingRule {
    pub fn new<I, S>(sequence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ResourceName>,
    {
        Self { sequence: sequence.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Set the composite ready state to false when desired resources are removed.
    #[serde(default)]
    pub reset_composite_readiness: bool,
    pub rules: Vec<SequencingRule>,
    /// Emit Usages so dependencies are deleted after their dependents.
    #[serde(default)]
    pub enable_deletion_sequencing: bool,
    /// Copied into `spec.replayDeletion` of every emitted Usage.
    #[serde(default)]
    pub replay_deletion: bool,
    #[serde(default)]
    pub usage_version: UsageVersion,
}

impl Input {
    pub fn from_value(v: &serde_json::Value) -> Result<Self> {
        Input::deserialize(v).map_err(SequencerError::Input)
    }

    pub fn options(&self) -> EvaluationOptions {
        EvaluationOptions {
            reset_composite_readiness: self.reset_composite_readiness,
            enable_deletion_sequencing: self.enable_deletion_sequencing,
            replay_deletion: self.replay_deletion,
            usage_version: self.usage_version,
        }
    }
}

/// Evaluation knobs, detached from the wire shape of [`Input`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationOptions {
    pub reset_composite_readiness: bool,
    pub enable_deletion_sequencing: bool,
    pub replay_deletion: bool,
    pub usage_version: UsageVersion,
}
