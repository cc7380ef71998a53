//! Audit engine
//!
//! Structural sanity checks. Findings are advisory: the audit never edits
//! the graph and never fails.

use crate::topology::Topology;
use crate::types::{CommandGraph, GraphId, NodeId, Severity};
use serde::{Deserialize, Serialize};

/// Issue id for a graph without nodes
pub const GRAPH_EMPTY: &str = "graph-empty";
/// Issue id for a graph that has not been planned into waves
pub const NO_WAVE_PLANNED: &str = "no-wave-planned";
/// Prefix of cycle issue ids
pub const CYCLE_DETECTED: &str = "cycle-detected";
/// Prefix of edge density issue ids
pub const EDGE_DENSITY: &str = "edge-density";

/// One structural finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub graph_id: GraphId,
    pub issue: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl AuditFinding {
    fn graph_level(graph_id: &GraphId, issue: impl Into<String>, severity: Severity) -> Self {
        Self {
            graph_id: graph_id.clone(),
            issue: issue.into(),
            severity,
            node_id: None,
        }
    }
}

/// Run every check against a graph and its topology.
///
/// Cycle findings mirror the topology's cycle traces one-to-one, duplicates
/// included.
#[must_use]
pub fn audit_graph(graph: &CommandGraph, topology: &Topology) -> Vec<AuditFinding> {
    let mut findings = Vec::new();

    if graph.nodes.is_empty() {
        findings.push(AuditFinding::graph_level(
            &graph.id,
            GRAPH_EMPTY,
            Severity::Critical,
        ));
    }

    if graph.waves.is_empty() {
        findings.push(AuditFinding::graph_level(
            &graph.id,
            NO_WAVE_PLANNED,
            Severity::Warning,
        ));
    }

    for cycle in &topology.cycles {
        findings.push(AuditFinding {
            graph_id: graph.id.clone(),
            issue: format!("{CYCLE_DETECTED}:{}", cycle.describe()),
            severity: Severity::Critical,
            node_id: Some(cycle.closing.clone()),
        });
    }

    if graph.edge_count() > graph.node_count() * 2 {
        findings.push(AuditFinding::graph_level(
            &graph.id,
            format!("{EDGE_DENSITY}:{}", graph.edge_count()),
            Severity::Info,
        ));
    }

    tracing::debug!(graph_id = %graph.id, findings = findings.len(), "audit complete");
    findings
}

/// Count findings at a given severity
#[must_use]
pub fn count_severity(findings: &[AuditFinding], severity: Severity) -> usize {
    findings.iter().filter(|f| f.severity == severity).count()
}
