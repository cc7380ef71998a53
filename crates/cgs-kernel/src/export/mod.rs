//! Graphviz export for dashboards

use crate::types::{CommandGraph, NodeId};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Build a petgraph view: node weights are `id: name`, edge weights are the
/// latency budget. Edge endpoints missing from the node set get a bare node.
#[must_use]
pub fn to_petgraph(graph: &CommandGraph) -> DiGraph<String, String> {
    let mut out = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
    let mut index: HashMap<&NodeId, NodeIndex> = HashMap::with_capacity(graph.node_count());

    for node in &graph.nodes {
        let ix = out.add_node(format!("{}: {}", node.id, node.name));
        index.entry(&node.id).or_insert(ix);
    }

    for edge in &graph.edges {
        let from = *index
            .entry(&edge.from)
            .or_insert_with(|| out.add_node(edge.from.to_string()));
        let to = *index
            .entry(&edge.to)
            .or_insert_with(|| out.add_node(edge.to.to_string()));
        out.add_edge(from, to, format!("{}ms", edge.latency_budget_ms));
    }

    out
}

/// Render a graph in DOT format
#[must_use]
pub fn to_dot(graph: &CommandGraph) -> String {
    format!("{}", Dot::new(&to_petgraph(graph)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandEdge, CommandNode, GraphId};

    #[test]
    fn dot_contains_nodes_and_edges() {
        let gid = GraphId::from("g");
        let g = CommandGraph::new(gid.clone(), "t", "r", "p")
            .with_node(CommandNode::new(gid.clone(), "a", "drain"))
            .with_node(CommandNode::new(gid, "b", "restore"))
            .with_edge(CommandEdge::new("a", "b").with_latency_budget_ms(250));

        let dot = to_dot(&g);
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("a: drain"));
        assert!(dot.contains("250ms"));
    }

    #[test]
    fn dangling_endpoint_gets_a_node() {
        let gid = GraphId::from("g");
        let g = CommandGraph::new(gid.clone(), "t", "r", "p")
            .with_node(CommandNode::new(gid, "a", "drain"))
            .with_edge(CommandEdge::new("a", "ghost"));
        let pg = to_petgraph(&g);
        assert_eq!(pg.node_count(), 2);
        assert_eq!(pg.edge_count(), 1);
    }
}
