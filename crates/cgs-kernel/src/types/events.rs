//! Graph events
//!
//! Immutable facts emitted by the mutator and the snapshot ledger. The pure
//! analyzers never produce events.

use super::{CommandEdge, CommandNode, GraphId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphEventKind {
    NodeAdded,
    EdgeAdded,
    NodeStateChanged,
    NodeRemoved,
    Snapshot,
}

impl GraphEventKind {
    /// Wire name of the event kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GraphEventKind::NodeAdded => "node_added",
            GraphEventKind::EdgeAdded => "edge_added",
            GraphEventKind::NodeStateChanged => "node_state_changed",
            GraphEventKind::NodeRemoved => "node_removed",
            GraphEventKind::Snapshot => "snapshot",
        }
    }
}

/// A self-describing graph event, safe to cross a persistence boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandGraphEvent {
    pub event_id: Uuid,
    pub kind: GraphEventKind,
    pub graph_id: GraphId,
    pub trace_id: String,
    pub emitted_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl CommandGraphEvent {
    /// Create an event stamped with the current time
    #[must_use]
    pub fn new(
        kind: GraphEventKind,
        graph_id: GraphId,
        trace_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            graph_id,
            trace_id: trace_id.into(),
            emitted_at: Utc::now(),
            payload,
        }
    }

    /// `node_state_changed`, keyed by `(graph, version, node)`
    #[must_use]
    pub fn node_state_changed(node: &CommandNode) -> Self {
        Self::new(
            GraphEventKind::NodeStateChanged,
            node.graph_id.clone(),
            node_trace_id(&node.graph_id, node.version, &node.id),
            serde_json::json!({
                "node_id": node.id,
                "state": node.state,
                "version": node.version,
                "state_at": node.state_at,
            }),
        )
    }

    /// `node_added`, carrying the full node
    #[must_use]
    pub fn node_added(node: &CommandNode) -> Self {
        Self::new(
            GraphEventKind::NodeAdded,
            node.graph_id.clone(),
            node_trace_id(&node.graph_id, node.version, &node.id),
            serde_json::json!({ "node": node }),
        )
    }

    /// `node_removed`, with the number of incident edges dropped alongside it
    #[must_use]
    pub fn node_removed(node: &CommandNode, dropped_edges: usize) -> Self {
        Self::new(
            GraphEventKind::NodeRemoved,
            node.graph_id.clone(),
            node_trace_id(&node.graph_id, node.version, &node.id),
            serde_json::json!({
                "node_id": node.id,
                "version": node.version,
                "dropped_edges": dropped_edges,
            }),
        )
    }

    /// `edge_added`
    #[must_use]
    pub fn edge_added(graph_id: &GraphId, edge: &CommandEdge) -> Self {
        Self::new(
            GraphEventKind::EdgeAdded,
            graph_id.clone(),
            format!("{graph_id}:{}->{}", edge.from, edge.to),
            serde_json::json!({ "edge": edge }),
        )
    }
}

/// Trace key of a node-scoped event
#[must_use]
pub fn node_trace_id(graph_id: &GraphId, version: u64, node_id: &NodeId) -> String {
    format!("{graph_id}:{version}:{node_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_change_is_keyed_by_graph_version_and_node() {
        let node = CommandNode::new(GraphId::from("g1"), "n1", "restart");
        let event = CommandGraphEvent::node_state_changed(&node);
        assert_eq!(event.kind, GraphEventKind::NodeStateChanged);
        assert_eq!(event.trace_id, "g1:1:n1");
        assert_eq!(event.payload["state"], "pending");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&GraphEventKind::NodeStateChanged).unwrap();
        assert_eq!(json, format!("\"{}\"", GraphEventKind::NodeStateChanged.as_str()));
    }
}
