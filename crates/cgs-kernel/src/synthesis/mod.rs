//! Synthesis facade
//!
//! The go/no-go entry point for planners. Composes topology, forecast and
//! audit into one `CommandSynthesisResult`. Deterministic for a given graph.

use crate::audit::{audit_graph, AuditFinding};
use crate::forecast::{forecast_graph, CommandGraphForecast, ForecastBreakdown};
use crate::topology::Topology;
use crate::types::{CommandGraph, GraphId, NodeId};
use serde::{Deserialize, Serialize};

/// Outcome handed to external planners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSynthesisResult {
    pub graph_id: GraphId,
    /// No blockers and no node lost to a cycle
    pub ready: bool,
    /// Audit issue ids; rerun the audit for severities
    pub conflicts: Vec<String>,
    pub critical_paths: Vec<NodeId>,
    pub readiness_score: u32,
    pub execution_order: Vec<NodeId>,
    pub forecast_minutes: u64,
}

/// Everything the facade computed on the way to its result
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub topology: Topology,
    pub breakdown: ForecastBreakdown,
    pub findings: Vec<AuditFinding>,
    pub result: CommandSynthesisResult,
}

impl SynthesisReport {
    /// The forecast part of the breakdown
    #[must_use]
    pub fn forecast(&self) -> &CommandGraphForecast {
        &self.breakdown.forecast
    }
}

/// `max(1, round(ms / 60 000))`
#[must_use]
pub fn forecast_minutes(ready_in_ms: u64) -> u64 {
    ((ready_in_ms as f64 / 60_000.0).round() as u64).max(1)
}

/// Run the full analysis
#[tracing::instrument(skip_all, fields(graph_id = %graph.id))]
#[must_use]
pub fn synthesize(graph: &CommandGraph) -> SynthesisReport {
    let topology = Topology::build(graph);
    let breakdown = forecast_graph(graph, &topology);
    let findings = audit_graph(graph, &topology);

    let ready = breakdown.forecast.blockers == 0 && topology.is_complete(graph);

    let result = CommandSynthesisResult {
        graph_id: graph.id.clone(),
        ready,
        conflicts: findings.iter().map(|f| f.issue.clone()).collect(),
        critical_paths: breakdown.critical_path.clone(),
        readiness_score: breakdown.readiness,
        execution_order: topology.ordered.clone(),
        forecast_minutes: forecast_minutes(breakdown.forecast.ready_in_ms),
    };

    tracing::debug!(
        ready = result.ready,
        conflicts = result.conflicts.len(),
        "synthesis complete"
    );

    SynthesisReport {
        topology,
        breakdown,
        findings,
        result,
    }
}

/// Planner entry point; see [`synthesize`] for the full report
#[must_use]
pub fn to_synthesis_result(graph: &CommandGraph) -> CommandSynthesisResult {
    synthesize(graph).result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandEdge, CommandNode, NodeState};

    fn chain(ids: &[&str]) -> CommandGraph {
        let gid = GraphId::from("g");
        let mut g = CommandGraph::new(gid.clone(), "tenant", "run", "plan");
        for id in ids {
            g = g.with_node(CommandNode::new(gid.clone(), *id, *id));
        }
        for pair in ids.windows(2) {
            g = g.with_edge(CommandEdge::new(pair[0], pair[1]));
        }
        g
    }

    #[test]
    fn forecast_minutes_floor() {
        assert_eq!(forecast_minutes(0), 1);
        assert_eq!(forecast_minutes(29_999), 1);
        assert_eq!(forecast_minutes(90_000), 2);
        assert_eq!(forecast_minutes(600_000), 10);
    }

    #[test]
    fn chain_is_ready() {
        let result = to_synthesis_result(&chain(&["a", "b", "c"]));
        assert!(result.ready);
        assert_eq!(result.execution_order.len(), 3);
        assert_eq!(result.conflicts, vec!["no-wave-planned".to_string()]);
    }

    #[test]
    fn blocker_clears_ready() {
        let mut g = chain(&["a", "b"]);
        g.nodes[1].state = NodeState::Blocked;
        let report = synthesize(&g);
        assert!(!report.result.ready);
        assert_eq!(report.forecast().blockers, 1);
    }

    #[test]
    fn cycle_clears_ready() {
        let g = chain(&["a", "b"]).with_edge(CommandEdge::new("b", "a"));
        let result = to_synthesis_result(&g);
        assert!(!result.ready);
        assert!(result.execution_order.is_empty());
        assert!(result
            .conflicts
            .iter()
            .any(|c| c.starts_with("cycle-detected:")));
    }

    #[test]
    fn empty_graph_is_ready_but_flagged() {
        let g = CommandGraph::new("g", "tenant", "run", "plan");
        let result = to_synthesis_result(&g);
        assert!(result.ready);
        assert!(result.conflicts.contains(&"graph-empty".to_string()));
    }
}
