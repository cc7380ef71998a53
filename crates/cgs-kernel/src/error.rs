//! Error types for the synthesis kernel
//!
//! Structural defects in a graph are never errors here: they come back as
//! audit findings. The variants below cover the recoverable failures a
//! caller has to branch on:
//! - Rejected ledger windows
//! - Failed graph rewrites
//! - Journal integrity violations
//! - Configuration loading

use crate::types::{GraphId, NodeId};

/// Boxed error returned by caller-supplied node transforms
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Umbrella error for the kernel
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// Derived or supplied window failed validation
    #[error("window rejected: {0}")]
    Window(#[from] WindowError),

    /// A graph rewrite was aborted
    #[error("rewrite failed: {0}")]
    Mutation(#[from] MutationError),

    /// Event journal check failed
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SynthesisError {
    /// Whether the caller can fix the input and try again
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Window(_) | Self::Mutation(_) | Self::Config(_) => true,
            Self::Journal(JournalError::IntegrityViolation { .. }) => false,
        }
    }
}

/// Window validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// `limit` must be positive
    #[error("window for {graph_id} has non-positive limit {limit}")]
    NonPositiveLimit { graph_id: GraphId, limit: i64 },

    /// `until` precedes `since`
    #[error("window for {graph_id} ends at {until} before it starts at {since}")]
    InvertedRange {
        graph_id: GraphId,
        since: String,
        until: String,
    },

    /// The window reaches before the earliest representable instant
    #[error("window for {graph_id} spanning {minutes} minutes is out of range")]
    SpanOutOfRange { graph_id: GraphId, minutes: String },
}

/// Graph mutation failures
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// A per-node transform failed; the whole batch is aborted
    #[error("transform failed for node {node_id}: {source}")]
    NodeRewriteFailed {
        node_id: NodeId,
        #[source]
        source: BoxError,
    },

    /// A transform returned a node with a different id
    #[error("transform changed node id from {expected} to {actual}")]
    IdentityChanged { expected: NodeId, actual: NodeId },

    /// Node does not exist in the graph
    #[error("node not found: {0}")]
    UnknownNode(NodeId),

    /// Node id already present in the graph
    #[error("duplicate node: {0}")]
    DuplicateNode(NodeId),
}

/// Event journal failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    /// Hash chain broken at the given sequence number
    #[error("journal integrity violated at sequence {sequence}")]
    IntegrityViolation { sequence: u64 },
}

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_error_display() {
        let err = WindowError::NonPositiveLimit {
            graph_id: GraphId::from("g"),
            limit: 0,
        };
        assert!(err.to_string().contains("non-positive limit 0"));
    }

    #[test]
    fn recoverability() {
        let window: SynthesisError = WindowError::NonPositiveLimit {
            graph_id: GraphId::from("g"),
            limit: -1,
        }
        .into();
        assert!(window.is_recoverable());

        let journal: SynthesisError = JournalError::IntegrityViolation { sequence: 3 }.into();
        assert!(!journal.is_recoverable());
    }

    #[test]
    fn rewrite_failure_keeps_source() {
        let err = MutationError::NodeRewriteFailed {
            node_id: NodeId::from("n1"),
            source: "boom".into(),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("n1"));
    }
}
