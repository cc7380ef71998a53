//! Input validation boundary
//!
//! The analyzers assume a well-formed graph and never call a validator
//! themselves. Whoever accepts graphs from outside (the CLI here, a schema
//! layer elsewhere) runs one first.

use crate::types::{CommandGraph, NodeId};
use std::collections::HashSet;

/// A reason a graph is not well formed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("edge {from}->{to} references unknown node {missing}")]
    DanglingEdge {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },
}

/// Precondition check applied before analysis
pub trait GraphValidator {
    /// Every problem found, empty when the graph is well formed
    fn validate(&self, graph: &CommandGraph) -> Vec<ValidationError>;
}

/// Checks node id uniqueness and edge endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceValidator;

impl GraphValidator for ReferenceValidator {
    fn validate(&self, graph: &CommandGraph) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen: HashSet<&NodeId> = HashSet::with_capacity(graph.node_count());

        for node in &graph.nodes {
            if !seen.insert(&node.id) {
                errors.push(ValidationError::DuplicateNode(node.id.clone()));
            }
        }

        for edge in &graph.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(endpoint) {
                    errors.push(ValidationError::DanglingEdge {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandEdge, CommandNode, GraphId};

    #[test]
    fn well_formed_graph_passes() {
        let gid = GraphId::from("g");
        let g = CommandGraph::new(gid.clone(), "t", "r", "p")
            .with_node(CommandNode::new(gid.clone(), "a", "a"))
            .with_node(CommandNode::new(gid, "b", "b"))
            .with_edge(CommandEdge::new("a", "b"));
        assert!(ReferenceValidator.validate(&g).is_empty());
    }

    #[test]
    fn reports_duplicates_and_dangling_edges() {
        let gid = GraphId::from("g");
        let g = CommandGraph::new(gid.clone(), "t", "r", "p")
            .with_node(CommandNode::new(gid.clone(), "a", "a"))
            .with_node(CommandNode::new(gid, "a", "again"))
            .with_edge(CommandEdge::new("a", "ghost"));

        let errors = ReferenceValidator.validate(&g);
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateNode(NodeId::from("a")),
                ValidationError::DanglingEdge {
                    from: NodeId::from("a"),
                    to: NodeId::from("ghost"),
                    missing: NodeId::from("ghost"),
                },
            ]
        );
    }
}
