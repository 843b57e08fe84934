//! Errors surfaced by sequencing. Every variant is fatal for the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequencerError {
    /// A sequence entry is not a valid regular expression.
    #[error("cannot compile regex {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// v1 usages can only protect cluster-scoped resources.
    #[error(
        "cannot protect namespaced resource (kind: {kind}, name: {name}, namespace: {namespace}) with usageVersion=v1. v1 usages only support cluster-scoped resources."
    )]
    NamespacedUsageV1 {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("cannot get Function input: request carries no input")]
    MissingInput,

    #[error("cannot get Function input: {0}")]
    Input(#[source] serde_json::Error),

    #[error("cannot convert usage to JSON: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SequencerError>;
