//! Usage synthesis for deletion sequencing.
//!
//! A Usage records that one composed resource (`by`) depends on another
//! (`of`), so Crossplane blocks deleting `of` while `by` still exists.

#![forbid(unsafe_code)]

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::{DynamicObject, TypeMeta};
use serde_json::{json, Value as Json};
use tracing::debug;

use sequencer_core::{ComposedResource, ObjectRef, Result, SequencerError, UsageVersion};

pub mod name;

pub use name::generate_name;

pub const DEPENDENCY_REASON: &str = "dependency";
/// Suffix applied when generating Usage names.
pub const USAGE_NAME_SUFFIX: &str = "dependency";

pub const PROTECTION_GROUP_VERSION: &str = "protection.crossplane.io/v1beta1";
pub const APIEXTENSIONS_GROUP_VERSION: &str = "apiextensions.crossplane.io/v1beta1";
pub const USAGE_KIND: &str = "Usage";
pub const CLUSTER_USAGE_KIND: &str = "ClusterUsage";

/// Usage API shape, resolved once from the configured [`UsageVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageSchema {
    /// `apiextensions.crossplane.io/v1beta1` Usage, cluster-scoped `of` only.
    Legacy,
    /// `protection.crossplane.io/v1beta1` ClusterUsage or namespaced Usage.
    Protection,
}

impl From<UsageVersion> for UsageSchema {
    fn from(v: UsageVersion) -> Self {
        match v {
            UsageVersion::V1 => UsageSchema::Legacy,
            UsageVersion::V2 => UsageSchema::Protection,
        }
    }
}

impl UsageSchema {
    pub fn api_version(&self) -> &'static str {
        match self {
            UsageSchema::Legacy => APIEXTENSIONS_GROUP_VERSION,
            UsageSchema::Protection => PROTECTION_GROUP_VERSION,
        }
    }

    /// Pick the kind and namespace of the Usage protecting `of`.
    fn scope_for(&self, of: &ObjectRef) -> Result<(&'static str, Option<String>)> {
        match (self, of.namespace.as_deref()) {
            (UsageSchema::Legacy, None) => Ok((USAGE_KIND, None)),
            (UsageSchema::Legacy, Some(ns)) => Err(SequencerError::NamespacedUsageV1 {
                kind: of.kind.clone(),
                name: of.name.clone(),
                namespace: ns.to_string(),
            }),
            (UsageSchema::Protection, None) => Ok((CLUSTER_USAGE_KIND, None)),
            (UsageSchema::Protection, Some(ns)) => Ok((USAGE_KIND, Some(ns.to_string()))),
        }
    }

    /// Whether an observed resource is itself a Usage of this schema.
    pub fn is_usage(&self, r: &ComposedResource) -> bool {
        let kind = r.kind();
        match self {
            UsageSchema::Legacy => kind == USAGE_KIND,
            UsageSchema::Protection => kind == USAGE_KIND || kind == CLUSTER_USAGE_KIND,
        }
    }

    /// Build a Usage of `of` by `by`.
    pub fn usage(&self, of: &ObjectRef, by: &ObjectRef, replay_deletion: bool) -> Result<DynamicObject> {
        let (kind, namespace) = self.scope_for(of)?;
        let base = format!("{}-{}-{}-{}", by.kind, by.name, of.kind, of.name).to_lowercase();
        let metadata = ObjectMeta {
            name: Some(generate_name(&base, USAGE_NAME_SUFFIX)),
            namespace,
            ..ObjectMeta::default()
        };
        Ok(DynamicObject {
            types: Some(TypeMeta { api_version: self.api_version().to_string(), kind: kind.to_string() }),
            metadata,
            data: json!({
                "spec": {
                    "by": resource_selector(by),
                    "of": resource_selector(of),
                    "reason": DEPENDENCY_REASON,
                    "replayDeletion": replay_deletion,
                }
            }),
        })
    }
}

fn resource_selector(r: &ObjectRef) -> Json {
    json!({
        "apiVersion": r.api_version,
        "kind": r.kind,
        "resourceRef": { "name": r.name },
    })
}

/// Build the Usage of `of` by `by` as a raw JSON object.
pub fn generate_usage(
    of: &ComposedResource,
    by: &ComposedResource,
    replay_deletion: bool,
    version: UsageVersion,
) -> Result<Json> {
    let usage = UsageSchema::from(version).usage(&of.object_ref(), &by.object_ref(), replay_deletion)?;
    let v = serde_json::to_value(&usage).map_err(SequencerError::Encode)?;
    debug!(
        kind = %usage.types.as_ref().map(|t| t.kind.as_str()).unwrap_or(""),
        name = %usage.metadata.name.as_deref().unwrap_or(""),
        namespace = ?usage.metadata.namespace,
        "created usage"
    );
    Ok(v)
}
