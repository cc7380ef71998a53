//! Forecast engine
//!
//! Readiness, cost, latency and risk estimates over a graph and its
//! topology. These feed execution planning; the ledger keeps its own,
//! coarser risk signal in [`crate::ledger`].

use crate::topology::Topology;
use crate::types::{CommandGraph, CommandNode, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed per-node overhead added to the latency estimate
pub const NODE_OVERHEAD_MS: u64 = 150;

/// Execution-planning forecast for a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandGraphForecast {
    pub ready_in_ms: u64,
    pub wave_count: usize,
    /// Nodes in `blocked` or `deferred` state
    pub blockers: usize,
    pub critical_path_length: usize,
    pub risk_score: i64,
    /// Nodes with warning or critical severity
    pub conflict_count: usize,
}

/// Every intermediate measure behind a [`CommandGraphForecast`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBreakdown {
    /// Percentage of resolved nodes
    pub readiness: u32,
    pub cost: f64,
    pub latency_ms: u64,
    pub risk_vector: i64,
    pub critical_path: Vec<NodeId>,
    pub forecast: CommandGraphForecast,
}

/// `round(resolved / max(total, 1) * 100)`
#[must_use]
pub fn readiness(graph: &CommandGraph) -> u32 {
    let resolved = graph
        .nodes
        .iter()
        .filter(|node| node.state == crate::types::NodeState::Resolved)
        .count();
    let total = graph.node_count().max(1);
    percentage(resolved, total)
}

/// Sum of node weights plus sum of edge costs
#[must_use]
pub fn cost(graph: &CommandGraph) -> f64 {
    let nodes: f64 = graph.nodes.iter().map(|node| node.weight).sum();
    let edges: f64 = graph.edges.iter().map(|edge| edge.cost).sum();
    nodes + edges
}

/// Sum of edge latency budgets plus the per-node overhead, saturating
#[must_use]
pub fn latency(graph: &CommandGraph) -> u64 {
    let transit = graph
        .edges
        .iter()
        .fold(0u64, |acc, edge| acc.saturating_add(edge.latency_budget_ms));
    transit.saturating_add((graph.node_count() as u64).saturating_mul(NODE_OVERHEAD_MS))
}

/// Risk contribution of a single node
#[must_use]
pub fn node_risk(node: &CommandNode) -> i64 {
    let factor = 0.6
        + 0.2 * f64::from(node.severity.rank())
        + 0.2 * f64::from(node.urgency.rank());
    ((node.weight + 1.0) * factor).round() as i64
}

/// Sum of per-node risk, saturating
#[must_use]
pub fn risk_vector(graph: &CommandGraph) -> i64 {
    graph
        .nodes
        .iter()
        .map(node_risk)
        .fold(0i64, i64::saturating_add)
}

/// Weight-ranked prefix of the topological order.
///
/// The ordered nodes are sorted by descending weight and the first
/// `ceil(n / 3)` are kept. Edge latency and the actual dependency chains are
/// not considered, so this is not a longest-path computation.
#[must_use]
pub fn critical_path(graph: &CommandGraph, topology: &Topology) -> Vec<NodeId> {
    let weights: HashMap<&NodeId, f64> = graph
        .nodes
        .iter()
        .map(|node| (&node.id, node.weight))
        .collect();

    let mut ranked: Vec<&NodeId> = topology.ordered.iter().collect();
    ranked.sort_by(|a, b| {
        let wa = weights.get(a).copied().unwrap_or(0.0);
        let wb = weights.get(b).copied().unwrap_or(0.0);
        wb.total_cmp(&wa)
    });

    let keep = topology.ordered.len().div_ceil(3);
    ranked.into_iter().take(keep).cloned().collect()
}

/// Compute the forecast together with its intermediate measures
#[must_use]
pub fn forecast_graph(graph: &CommandGraph, topology: &Topology) -> ForecastBreakdown {
    let readiness = readiness(graph);
    let cost = cost(graph);
    let latency_ms = latency(graph);
    let risk_vector = risk_vector(graph);
    let critical_path = critical_path(graph, topology);

    let blockers = graph
        .nodes
        .iter()
        .filter(|node| node.state.is_blocking())
        .count();
    let conflict_count = graph
        .nodes
        .iter()
        .filter(|node| node.severity.is_conflict())
        .count();

    let forecast = CommandGraphForecast {
        ready_in_ms: latency_ms,
        wave_count: topology.layers.len(),
        blockers,
        critical_path_length: critical_path.len(),
        risk_score: risk_vector.saturating_add(i64::from(readiness)).max(1),
        conflict_count,
    };

    ForecastBreakdown {
        readiness,
        cost,
        latency_ms,
        risk_vector,
        critical_path,
        forecast,
    }
}

/// Compute only the forecast
#[must_use]
pub fn forecast(graph: &CommandGraph, topology: &Topology) -> CommandGraphForecast {
    forecast_graph(graph, topology).forecast
}

pub(crate) fn percentage(part: usize, whole: usize) -> u32 {
    (part as f64 / whole.max(1) as f64 * 100.0).round() as u32
}
