//! Stress harness
//!
//! Generates seeded random DAGs and checks the topology invariants on each:
//! - every edge goes from an earlier wave to a later one
//! - every node is ordered and layered
//! - no cycle is reported

use crate::topology::Topology;
use crate::types::{
    CommandEdge, CommandGraph, CommandNode, GraphId, NodeId, NodeState, Severity, Urgency,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

/// Stress run configuration
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of graphs to generate
    pub graphs: usize,
    pub nodes_per_graph: usize,
    /// Chance of an edge between any forward pair of nodes
    pub edge_probability: f64,
    pub stop_on_first_violation: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            graphs: 100,
            nodes_per_graph: 50,
            edge_probability: 0.1,
            stop_on_first_violation: false,
        }
    }
}

/// An invariant broken on a generated graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// An edge does not point into a later wave
    UnsoundWave {
        graph_id: GraphId,
        from: NodeId,
        to: NodeId,
    },
    /// Ordering dropped nodes from an acyclic graph
    IncompleteOrder {
        graph_id: GraphId,
        ordered: usize,
        total: usize,
    },
    /// Layering dropped nodes from an acyclic graph
    IncompleteLayers {
        graph_id: GraphId,
        layered: usize,
        total: usize,
    },
    /// A cycle was reported on an acyclic graph
    SpuriousCycle { graph_id: GraphId },
}

/// Report from a stress run
#[derive(Debug, Clone)]
pub struct StressReport {
    pub config: StressConfig,
    pub graphs: usize,
    pub nodes: usize,
    pub edges: usize,
    pub violations: Vec<Violation>,
    pub elapsed_ms: u64,
}

impl StressReport {
    /// True when no invariant was broken
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable summary for the CLI
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Topology Stress Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Graphs: {}\n", self.graphs));
        report.push_str(&format!("Nodes: {}\n", self.nodes));
        report.push_str(&format!("Edges: {}\n", self.edges));
        report.push_str(&format!("Elapsed: {}ms\n", self.elapsed_ms));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

const SEVERITIES: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Critical];
const URGENCIES: [Urgency; 3] = [Urgency::Low, Urgency::Medium, Urgency::High];
const STATES: [NodeState; 5] = [
    NodeState::Pending,
    NodeState::Active,
    NodeState::Deferred,
    NodeState::Blocked,
    NodeState::Resolved,
];

/// Random acyclic graph: edges only run from lower to higher node index.
/// A non-finite `edge_probability` yields no edges.
pub fn random_dag(
    rng: &mut StdRng,
    graph_id: GraphId,
    nodes: usize,
    edge_probability: f64,
) -> CommandGraph {
    let p = if edge_probability.is_finite() {
        edge_probability.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut graph = CommandGraph::new(graph_id.clone(), "stress", "run", "plan");

    for i in 0..nodes {
        let node = CommandNode::new(graph_id.clone(), format!("n{i}"), format!("command-{i}"))
            .with_weight(f64::from(rng.gen_range(0u32..10)))
            .with_severity(SEVERITIES[rng.gen_range(0..SEVERITIES.len())])
            .with_urgency(URGENCIES[rng.gen_range(0..URGENCIES.len())])
            .with_state(STATES[rng.gen_range(0..STATES.len())]);
        graph.nodes.push(node);
    }

    for from in 0..nodes {
        for to in (from + 1)..nodes {
            if rng.gen_bool(p) {
                graph.edges.push(
                    CommandEdge::new(format!("n{from}"), format!("n{to}"))
                        .with_order(rng.gen_range(0..100))
                        .with_latency_budget_ms(rng.gen_range(0..1_000))
                        .with_cost(f64::from(rng.gen_range(0u32..5))),
                );
            }
        }
    }

    graph
}

/// Check the topology invariants of an acyclic graph
#[must_use]
pub fn check_acyclic_graph(graph: &CommandGraph) -> Vec<Violation> {
    let topology = Topology::build(graph);
    let mut violations = Vec::new();
    let total = graph.node_count();

    if topology.ordered.len() != total {
        violations.push(Violation::IncompleteOrder {
            graph_id: graph.id.clone(),
            ordered: topology.ordered.len(),
            total,
        });
    }

    let layered: usize = topology.layers.iter().map(Vec::len).sum();
    if layered != total {
        violations.push(Violation::IncompleteLayers {
            graph_id: graph.id.clone(),
            layered,
            total,
        });
    }

    if !topology.cycles.is_empty() {
        violations.push(Violation::SpuriousCycle {
            graph_id: graph.id.clone(),
        });
    }

    let waves = topology.wave_index();
    for edge in &graph.edges {
        let sound = match (waves.get(&edge.from), waves.get(&edge.to)) {
            (Some(from), Some(to)) => from < to,
            _ => false,
        };
        if !sound {
            violations.push(Violation::UnsoundWave {
                graph_id: graph.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
        }
    }

    violations
}

/// Generate `config.graphs` random DAGs and check each one
pub fn run_stress(config: StressConfig) -> StressReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let started = Instant::now();

    let mut graphs = 0;
    let mut nodes = 0;
    let mut edges = 0;
    let mut violations = Vec::new();

    for i in 0..config.graphs {
        let graph = random_dag(
            &mut rng,
            GraphId::new(format!("stress-{}-{i}", config.seed)),
            config.nodes_per_graph,
            config.edge_probability,
        );
        graphs += 1;
        nodes += graph.node_count();
        edges += graph.edge_count();

        violations.extend(check_acyclic_graph(&graph));
        if config.stop_on_first_violation && !violations.is_empty() {
            break;
        }
    }

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        "stress run checked {} graphs ({} nodes), {} violations",
        graphs,
        nodes,
        violations.len()
    );

    StressReport {
        config,
        graphs,
        nodes,
        edges,
        violations,
        elapsed_ms,
    }
}
