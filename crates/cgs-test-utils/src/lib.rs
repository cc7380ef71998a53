//! Testing utilities for CGS workspace
//!
//! Shared graph fixtures for the kernel's integration tests.

#![allow(missing_docs)]

use cgs_kernel::types::{CommandEdge, CommandGraph, CommandNode, GraphId, NodeState, Severity};
use chrono::{DateTime, TimeZone, Utc};

pub const TEST_GRAPH: &str = "graph-test";
pub const TEST_TENANT: &str = "tenant-test";

/// Fixed instant, `secs` after 2024-01-01T00:00:00Z
pub fn instant(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap()
}

pub fn empty_graph() -> CommandGraph {
    let mut graph = CommandGraph::new(TEST_GRAPH, TEST_TENANT, "run-test", "plan-test");
    graph.created_at = instant(0);
    graph.updated_at = instant(0);
    graph
}

/// Pending info node named after its id, timestamped at [`instant`]`(0)`
pub fn node(id: &str) -> CommandNode {
    let mut node = CommandNode::new(GraphId::from(TEST_GRAPH), id, format!("command {id}"));
    node.created_at = instant(0);
    node.updated_at = instant(0);
    node.state_at = instant(0);
    node
}

pub fn node_with(id: &str, severity: Severity, state: NodeState) -> CommandNode {
    node(id).with_severity(severity).with_state(state)
}

/// Graph over the given nodes and `(from, to)` edges
pub fn graph_with(nodes: Vec<CommandNode>, edges: &[(&str, &str)]) -> CommandGraph {
    let mut graph = empty_graph();
    graph.nodes = nodes;
    graph.edges = edges
        .iter()
        .map(|(from, to)| CommandEdge::new(*from, *to))
        .collect();
    graph
}

/// `ids[0] -> ids[1] -> ... -> ids[n-1]`
pub fn chain_graph(ids: &[&str]) -> CommandGraph {
    let edges: Vec<(&str, &str)> = ids.windows(2).map(|w| (w[0], w[1])).collect();
    graph_with(ids.iter().map(|id| node(id)).collect(), &edges)
}

/// `a -> {b, c} -> d`
pub fn diamond_graph() -> CommandGraph {
    graph_with(
        ["a", "b", "c", "d"].iter().map(|id| node(id)).collect(),
        &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
    )
}

/// `a -> b -> c -> a`
pub fn cycle_graph() -> CommandGraph {
    graph_with(
        ["a", "b", "c"].iter().map(|id| node(id)).collect(),
        &[("a", "b"), ("b", "c"), ("c", "a")],
    )
}
