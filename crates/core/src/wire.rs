//! JSON shape of the function request/response envelope.
//!
//! Mirrors the function SDK's `RunFunctionRequest` / `RunFunctionResponse`
//! in protobuf-JSON form, limited to the fields sequencing reads or writes.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::{ComposedResource, ComposedResources, Ready, ResourceName};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMeta {
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub resource: Json,
    #[serde(default, skip_serializing_if = "Ready::is_unspecified")]
    pub ready: Ready,
    /// Base64 values keyed by connection detail name; passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub connection_details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<Resource>,
    #[serde(default)]
    pub resources: BTreeMap<String, Resource>,
}

impl State {
    pub fn composed(&self) -> ComposedResources {
        self.resources
            .iter()
            .map(|(k, r)| (ResourceName::from(k.as_str()), ComposedResource::new(r.resource.clone(), r.ready)))
            .collect()
    }

    /// Replace the composed resources. Entries that survive keep their
    /// connection details.
    pub fn set_composed(&mut self, composed: ComposedResources) {
        let mut previous = std::mem::take(&mut self.resources);
        self.resources = composed
            .into_iter()
            .map(|(k, r)| {
                let connection_details = previous.remove(k.as_str()).map(|p| p.connection_details).unwrap_or_default();
                (k.to_string(), Resource { resource: r.resource, ready: r.ready, connection_details })
            })
            .collect();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFunctionRequest {
    #[serde(default)]
    pub meta: RequestMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Json>,
    #[serde(default)]
    pub observed: State,
    #[serde(default)]
    pub desired: State,
    /// Pipeline context shared between functions; carried forward as is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub tag: String,
    /// Protobuf-JSON duration, e.g. `"60s"`.
    pub ttl: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "SEVERITY_NORMAL")]
    Normal,
    #[serde(rename = "SEVERITY_WARNING")]
    Warning,
    #[serde(rename = "SEVERITY_FATAL")]
    Fatal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    #[default]
    #[serde(rename = "TARGET_COMPOSITE")]
    Composite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub target: Target,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFunctionResponse {
    pub meta: ResponseMeta,
    #[serde(default)]
    pub desired: State,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<FunctionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Json>,
}

impl RunFunctionResponse {
    /// Response carrying the request's tag, desired state and context forward.
    pub fn to(req: &RunFunctionRequest, ttl: Duration) -> Self {
        Self {
            meta: ResponseMeta { tag: req.meta.tag.clone(), ttl: format!("{}s", ttl.as_secs()) },
            desired: req.desired.clone(),
            results: Vec::new(),
            context: req.context.clone(),
        }
    }

    pub fn normal(&mut self, message: impl Into<String>) {
        self.results.push(FunctionResult { severity: Severity::Normal, message: message.into(), target: Target::Composite });
    }

    pub fn fatal(&mut self, message: impl Into<String>) {
        self.results.push(FunctionResult { severity: Severity::Fatal, message: message.into(), target: Target::Composite });
    }

    pub fn is_fatal(&self) -> bool {
        self.results.iter().any(|r| r.severity == Severity::Fatal)
    }
}
