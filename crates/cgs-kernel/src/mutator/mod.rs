//! Graph mutator
//!
//! Every mutation follows the same shape: the input graph is read, a list
//! of per-node updates is derived, one event is emitted per update, and a
//! new graph is assembled from the updates. Nothing is edited in place.
//!
//! Mutations do not re-plan. Waves are carried over as they were; callers
//! that change dependency-relevant fields run wave planning again.

use crate::error::{BoxError, MutationError};
use crate::types::{
    advance_clock, CommandEdge, CommandGraph, CommandGraphEvent, CommandNode, NodeId,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::future::Future;

/// Caller-supplied asynchronous transform applied to each node
#[async_trait::async_trait]
pub trait NodeRewriter: Send + Sync {
    /// Produce the replacement for one node
    async fn rewrite(&self, node: CommandNode) -> Result<CommandNode, BoxError>;
}

/// Adapter turning an async closure into a [`NodeRewriter`]
pub struct FnRewriter<F> {
    func: F,
}

#[async_trait::async_trait]
impl<F, Fut> NodeRewriter for FnRewriter<F>
where
    F: Fn(CommandNode) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CommandNode, BoxError>> + Send,
{
    async fn rewrite(&self, node: CommandNode) -> Result<CommandNode, BoxError> {
        (self.func)(node).await
    }
}

/// Wrap an async closure as a rewriter
pub fn rewrite_with<F, Fut>(func: F) -> FnRewriter<F>
where
    F: Fn(CommandNode) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CommandNode, BoxError>> + Send,
{
    FnRewriter { func }
}

/// A settled per-node update: the node before and after the transform
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpdate {
    pub before: CommandNode,
    pub after: CommandNode,
}

impl NodeUpdate {
    /// Whether the transform moved the node to a new state
    #[must_use]
    pub fn state_changed(&self) -> bool {
        self.before.state != self.after.state
    }
}

/// A new graph plus the events that produced it
#[derive(Debug, Clone)]
pub struct GraphRewrite {
    pub graph: CommandGraph,
    pub events: Vec<CommandGraphEvent>,
}

/// Enforce node invariants on a transform's output
fn settle(
    before: &CommandNode,
    mut after: CommandNode,
    at: DateTime<Utc>,
) -> Result<NodeUpdate, MutationError> {
    if after.id != before.id {
        return Err(MutationError::IdentityChanged {
            expected: before.id.clone(),
            actual: after.id,
        });
    }

    after.version = after.version.max(before.version + 1);
    if after.state != before.state {
        after.state_at = at;
    }
    after.state_at = after.state_at.max(after.created_at);
    after.updated_at = at;

    Ok(NodeUpdate {
        before: before.clone(),
        after,
    })
}

/// Apply `rewriter` to every node concurrently.
///
/// All transforms are started together and awaited as one batch. The
/// returned nodes keep the input order. The first failure aborts the batch
/// and no graph is returned.
#[tracing::instrument(skip_all, fields(graph_id = %graph.id, nodes = graph.nodes.len()))]
pub async fn rewrite_graph<R>(
    graph: &CommandGraph,
    rewriter: &R,
) -> Result<GraphRewrite, MutationError>
where
    R: NodeRewriter + ?Sized,
{
    let at = advance_clock(graph.updated_at);

    let pending = graph.nodes.iter().map(|node| async move {
        let rewritten = rewriter.rewrite(node.clone()).await.map_err(|source| {
            MutationError::NodeRewriteFailed {
                node_id: node.id.clone(),
                source,
            }
        })?;
        settle(node, rewritten, at)
    });

    let updates = match try_join_all(pending).await {
        Ok(updates) => updates,
        Err(err) => {
            tracing::warn!("rewrite aborted: {err}");
            return Err(err);
        }
    };

    let events: Vec<CommandGraphEvent> = updates
        .iter()
        .map(|update| CommandGraphEvent::node_state_changed(&update.after))
        .collect();

    let changed = updates.iter().filter(|u| u.state_changed()).count();
    tracing::info!("rewrote {} nodes, {} changed state", updates.len(), changed);

    let mut next = graph.clone();
    next.nodes = updates.into_iter().map(|update| update.after).collect();
    next.updated_at = at;

    Ok(GraphRewrite {
        graph: next,
        events,
    })
}

/// Append a node; its `graph_id` is set to the graph's
pub fn add_node(graph: &CommandGraph, node: CommandNode) -> Result<GraphRewrite, MutationError> {
    if graph.contains_node(&node.id) {
        return Err(MutationError::DuplicateNode(node.id));
    }

    let mut node = node;
    node.graph_id = graph.id.clone();
    let event = CommandGraphEvent::node_added(&node);

    let mut next = graph.clone();
    next.nodes.push(node);
    next.updated_at = advance_clock(graph.updated_at);

    Ok(GraphRewrite {
        graph: next,
        events: vec![event],
    })
}

/// Append an edge. Endpoints are not checked against the node set.
#[must_use]
pub fn add_edge(graph: &CommandGraph, edge: CommandEdge) -> GraphRewrite {
    let event = CommandGraphEvent::edge_added(&graph.id, &edge);

    let mut next = graph.clone();
    next.edges.push(edge);
    next.updated_at = advance_clock(graph.updated_at);

    GraphRewrite {
        graph: next,
        events: vec![event],
    }
}

/// Remove a node together with every edge touching it
pub fn remove_node(graph: &CommandGraph, id: &NodeId) -> Result<GraphRewrite, MutationError> {
    let node = graph
        .node(id)
        .ok_or_else(|| MutationError::UnknownNode(id.clone()))?;

    let mut next = graph.clone();
    next.nodes.retain(|n| &n.id != id);
    next.edges.retain(|e| &e.from != id && &e.to != id);
    next.updated_at = advance_clock(graph.updated_at);

    let dropped = graph.edge_count() - next.edge_count();
    let event = CommandGraphEvent::node_removed(node, dropped);

    Ok(GraphRewrite {
        graph: next,
        events: vec![event],
    })
}

/// Canonical ordering: nodes by name, edges by `(order, latency_budget_ms)`.
///
/// The sort is stable, so applying it twice yields the same arrays. The
/// `updated_at` stamp advances on every call.
#[must_use]
pub fn normalize_command_graph(graph: &CommandGraph) -> CommandGraph {
    let mut next = graph.clone();
    next.nodes.sort_by(|a, b| a.name.cmp(&b.name));
    next.edges.sort_by_key(|edge| (edge.order, edge.latency_budget_ms));
    next.updated_at = advance_clock(graph.updated_at);
    next
}
