//! Sequencer core types: composed resources, readiness, function input and errors.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub mod error;
pub mod input;
pub mod wire;

pub use error::{Result, SequencerError};
pub use input::{EvaluationOptions, Input, SequencingRule, UsageVersion};

/// Name of a composed resource inside a composition (the key of the
/// desired/observed maps, not the Kubernetes `metadata.name`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self { Self(s) }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str { &self.0 }
}

/// Readiness as reported by the function pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ready {
    #[default]
    #[serde(rename = "READY_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "READY_TRUE")]
    True,
    #[serde(rename = "READY_FALSE")]
    False,
}

impl Ready {
    pub fn is_unspecified(&self) -> bool { matches!(self, Ready::Unspecified) }
    /// Only an explicit `True` counts; unspecified readiness is not ready.
    pub fn is_true(&self) -> bool { matches!(self, Ready::True) }
}

/// Reference to a Kubernetes object read from a raw body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

/// A desired or observed composed resource: raw object body plus readiness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposedResource {
    pub resource: Json,
    #[serde(default, skip_serializing_if = "Ready::is_unspecified")]
    pub ready: Ready,
}

impl ComposedResource {
    pub fn new(resource: Json, ready: Ready) -> Self { Self { resource, ready } }

    pub fn api_version(&self) -> &str { str_at(&self.resource, &["apiVersion"]) }
    pub fn kind(&self) -> &str { str_at(&self.resource, &["kind"]) }
    pub fn name(&self) -> &str { str_at(&self.resource, &["metadata", "name"]) }

    /// Empty namespaces read as cluster-scoped.
    pub fn namespace(&self) -> Option<&str> {
        let ns = str_at(&self.resource, &["metadata", "namespace"]);
        if ns.is_empty() { None } else { Some(ns) }
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            api_version: self.api_version().to_string(),
            kind: self.kind().to_string(),
            name: self.name().to_string(),
            namespace: self.namespace().map(|s| s.to_string()),
        }
    }
}

fn str_at<'a>(v: &'a Json, path: &[&str]) -> &'a str {
    let mut cur = v;
    for seg in path {
        match cur.get(seg) {
            Some(next) => cur = next,
            None => return "",
        }
    }
    cur.as_str().unwrap_or("")
}

/// Composed resources keyed by name. Ordered so iteration is deterministic.
pub type ComposedResources = BTreeMap<ResourceName, ComposedResource>;

pub mod prelude {
    pub use super::{
        ComposedResource, ComposedResources, EvaluationOptions, Input, ObjectRef, Ready, ResourceName,
        SequencerError, SequencingRule, UsageVersion,
    };
}
