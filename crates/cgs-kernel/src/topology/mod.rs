//! Topology analyzer
//!
//! Adjacency, cycle detection, topological order and wave layering over a
//! `CommandGraph`. Everything here is pure: the input graph is only read.
//!
//! Cycle members are silently absent from both the ordering and the layers.
//! Callers detect this by comparing `ordered.len()` with the node count.
//! Edges are trusted to reference existing nodes; a dangling target can
//! still surface in the ordering once all of its known sources are done.

use crate::types::{
    advance_clock, CommandGraph, CommandNode, CommandWave, ExecutionState, NodeId,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Forward and reverse adjacency derived from the edge set.
///
/// Duplicate edges are kept, so a repeated dependency shows up twice in the
/// successor list and counts twice towards in-degree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Adjacency {
    forward: IndexMap<NodeId, Vec<NodeId>>,
    reverse: IndexMap<NodeId, Vec<NodeId>>,
}

impl Adjacency {
    /// Build both directions in one pass over nodes then edges
    #[must_use]
    pub fn from_graph(graph: &CommandGraph) -> Self {
        let mut forward: IndexMap<NodeId, Vec<NodeId>> = IndexMap::new();
        let mut reverse: IndexMap<NodeId, Vec<NodeId>> = IndexMap::new();

        for node in &graph.nodes {
            forward.entry(node.id.clone()).or_default();
            reverse.entry(node.id.clone()).or_default();
        }

        for edge in &graph.edges {
            forward
                .entry(edge.from.clone())
                .or_default()
                .push(edge.to.clone());
            reverse
                .entry(edge.to.clone())
                .or_default()
                .push(edge.from.clone());
        }

        Self { forward, reverse }
    }

    /// Successors of a node, in edge order
    #[must_use]
    pub fn successors(&self, id: &NodeId) -> &[NodeId] {
        self.forward.get(id).map_or(&[], Vec::as_slice)
    }

    /// Predecessors of a node, in edge order
    #[must_use]
    pub fn predecessors(&self, id: &NodeId) -> &[NodeId] {
        self.reverse.get(id).map_or(&[], Vec::as_slice)
    }

    /// In-degree of every node, plus any edge target not in the node set
    fn in_degrees(&self, graph: &CommandGraph) -> IndexMap<NodeId, usize> {
        let mut degrees: IndexMap<NodeId, usize> = graph
            .nodes
            .iter()
            .map(|node| (node.id.clone(), 0))
            .collect();

        for targets in self.forward.values() {
            for to in targets {
                *degrees.entry(to.clone()).or_insert(0) += 1;
            }
        }

        degrees
    }
}

/// A cycle found by the depth-first search.
///
/// `path` starts and ends at `closing`, the on-path node that was revisited;
/// the last two entries form the closing edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleTrace {
    pub path: Vec<NodeId>,
    pub closing: NodeId,
}

impl CycleTrace {
    /// Render the path as `a->b->c->a`
    #[must_use]
    pub fn describe(&self) -> String {
        self.path
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join("->")
    }
}

/// Result of analysing a graph's structure
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub adjacency: Adjacency,
    /// Kahn order; cycle members are missing
    pub ordered: Vec<NodeId>,
    /// Waves as id layers; never empty, an empty graph has one empty layer
    pub layers: Vec<Vec<NodeId>>,
    pub cycles: Vec<CycleTrace>,
}

impl Topology {
    /// Analyse a graph
    #[must_use]
    pub fn build(graph: &CommandGraph) -> Self {
        let adjacency = Adjacency::from_graph(graph);
        let ordered = topological_order(graph, &adjacency);
        let layers = layer_waves(graph, &adjacency);
        let cycles = detect_cycles(graph, &adjacency);

        tracing::debug!(
            graph_id = %graph.id,
            ordered = ordered.len(),
            layers = layers.len(),
            cycles = cycles.len(),
            "built topology"
        );
        if !cycles.is_empty() {
            tracing::warn!(graph_id = %graph.id, "graph contains {} cycle traces", cycles.len());
        }

        Self {
            adjacency,
            ordered,
            layers,
            cycles,
        }
    }

    /// Whether every node made it into the ordering
    #[must_use]
    pub fn is_complete(&self, graph: &CommandGraph) -> bool {
        self.ordered.len() == graph.node_count()
    }

    /// Wave index of every layered node
    #[must_use]
    pub fn wave_index(&self) -> HashMap<&NodeId, usize> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(index, layer)| layer.iter().map(move |id| (id, index)))
            .collect()
    }
}

/// Analyse a graph; see [`Topology::build`]
#[must_use]
pub fn build_topology(graph: &CommandGraph) -> Topology {
    Topology::build(graph)
}

fn zero_in_degree(graph: &CommandGraph, degrees: &IndexMap<NodeId, usize>) -> Vec<NodeId> {
    graph
        .nodes
        .iter()
        .filter(|node| degrees.get(&node.id).copied().unwrap_or(0) == 0)
        .map(|node| node.id.clone())
        .collect()
}

/// Decrement the in-degree of `to`; true when it just reached zero
fn release(degrees: &mut IndexMap<NodeId, usize>, to: &NodeId) -> bool {
    match degrees.get_mut(to) {
        Some(degree) if *degree > 0 => {
            *degree -= 1;
            *degree == 0
        }
        _ => false,
    }
}

/// Kahn's algorithm seeded with every zero in-degree node, in node order
#[must_use]
pub fn topological_order(graph: &CommandGraph, adjacency: &Adjacency) -> Vec<NodeId> {
    let mut degrees = adjacency.in_degrees(graph);
    let mut queue: VecDeque<NodeId> = zero_in_degree(graph, &degrees).into();
    let mut ordered = Vec::with_capacity(graph.node_count());

    while let Some(id) = queue.pop_front() {
        for to in adjacency.successors(&id) {
            if release(&mut degrees, to) {
                queue.push_back(to.clone());
            }
        }
        ordered.push(id);
    }

    ordered
}

/// Peel zero in-degree frontiers into layers; layer k feeds layer k+1
#[must_use]
pub fn layer_waves(graph: &CommandGraph, adjacency: &Adjacency) -> Vec<Vec<NodeId>> {
    let mut degrees = adjacency.in_degrees(graph);
    let mut frontier = zero_in_degree(graph, &degrees);
    let mut layers = Vec::new();

    loop {
        let mut next = Vec::new();
        for id in &frontier {
            for to in adjacency.successors(id) {
                if release(&mut degrees, to) {
                    next.push(to.clone());
                }
            }
        }
        layers.push(frontier);
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    layers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Grey,
    Black,
}

/// Three-color depth-first search started from every node in turn.
///
/// Each entry node gets a fresh coloring and the search never stops at the
/// first cycle, so one cycle is reported once per entry node that reaches
/// it.
#[must_use]
pub fn detect_cycles(graph: &CommandGraph, adjacency: &Adjacency) -> Vec<CycleTrace> {
    let mut cycles = Vec::new();

    for entry in &graph.nodes {
        let mut colors: HashMap<&NodeId, Color> = HashMap::new();
        let mut stack: Vec<(&NodeId, usize)> = vec![(&entry.id, 0)];
        colors.insert(&entry.id, Color::Grey);

        while let Some(&(current, cursor)) = stack.last() {
            let successors = adjacency.successors(current);
            let Some(next) = successors.get(cursor) else {
                colors.insert(current, Color::Black);
                stack.pop();
                continue;
            };

            let top = stack.len() - 1;
            stack[top].1 += 1;

            match colors.get(next) {
                None => {
                    colors.insert(next, Color::Grey);
                    stack.push((next, 0));
                }
                Some(Color::Grey) => {
                    let start = stack
                        .iter()
                        .position(|(id, _)| *id == next)
                        .unwrap_or(0);
                    let mut path: Vec<NodeId> =
                        stack[start..].iter().map(|(id, _)| (*id).clone()).collect();
                    path.push(next.clone());
                    cycles.push(CycleTrace {
                        path,
                        closing: next.clone(),
                    });
                }
                Some(Color::Black) => {}
            }
        }
    }

    cycles
}

/// Turn topology layers into waves of full command nodes
#[must_use]
pub fn plan_waves(graph: &CommandGraph, topology: &Topology) -> Vec<CommandWave> {
    let by_id: HashMap<&NodeId, &CommandNode> =
        graph.nodes.iter().map(|node| (&node.id, node)).collect();

    let mut previous: Vec<NodeId> = Vec::new();
    let mut waves = Vec::with_capacity(topology.layers.len());

    for (index, layer) in topology.layers.iter().enumerate() {
        let commands: Vec<CommandNode> = layer
            .iter()
            .filter_map(|id| by_id.get(id).map(|node| (*node).clone()))
            .collect();
        waves.push(CommandWave {
            index,
            commands,
            depends_on: std::mem::take(&mut previous),
            execution_state: ExecutionState::Queued,
        });
        previous.clone_from(layer);
    }

    waves
}

/// New graph with its waves populated from the current topology
#[must_use]
pub fn plan_graph(graph: &CommandGraph) -> CommandGraph {
    let topology = Topology::build(graph);
    let mut planned = graph.clone();
    planned.waves = plan_waves(graph, &topology);
    planned.updated_at = advance_clock(graph.updated_at);
    planned
}
