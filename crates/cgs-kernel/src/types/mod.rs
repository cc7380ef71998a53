//! Graph model
//!
//! Nodes, edges, waves and the `CommandGraph` aggregate root. Every operation
//! in this crate treats these as immutable values at the call boundary: a
//! mutation returns a new graph instead of editing the one it was given.

pub mod events;

pub use events::{CommandGraphEvent, GraphEventKind};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a command node, unique within its graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a command graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(pub String);

impl GraphId {
    /// Create a graph id from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GraphId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GraphId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Severity of a node, also used for audit findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Rank used by the risk heuristics: info=1, warning=2, critical=3
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Warning => 2,
            Severity::Critical => 3,
        }
    }

    /// Whether this severity counts as a conflict (warning or critical)
    #[inline]
    #[must_use]
    pub fn is_conflict(self) -> bool {
        matches!(self, Severity::Warning | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// How soon a node has to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Rank used by the risk heuristics: low=1, medium=2, high=3
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Urgency::Low => 1,
            Urgency::Medium => 2,
            Urgency::High => 3,
        }
    }
}

/// Lifecycle state of a command node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Pending,
    Active,
    Deferred,
    Blocked,
    Resolved,
}

impl NodeState {
    /// Blocked and deferred nodes hold up execution
    #[inline]
    #[must_use]
    pub fn is_blocking(self) -> bool {
        matches!(self, NodeState::Blocked | NodeState::Deferred)
    }
}

/// Execution state of a planned wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Queued,
    Running,
    Successful,
    Failed,
    Retry,
}

/// Which planner produced a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphSource {
    #[serde(rename = "planner")]
    Planner,
    #[serde(rename = "planner-v2")]
    PlannerV2,
}

/// A unit of recovery work within a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandNode {
    pub id: NodeId,
    pub graph_id: GraphId,
    pub name: String,
    pub group: String,
    pub severity: Severity,
    pub urgency: Urgency,
    /// Non-negative weight used by the cost and critical-path heuristics
    pub weight: f64,
    pub state: NodeState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Time of the last state transition, never earlier than `created_at`
    pub state_at: DateTime<Utc>,
    /// Bumped on every mutation of this node
    pub version: u64,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tags_version: u32,
}

impl CommandNode {
    /// Create a pending node at version 1 with neutral classification
    #[must_use]
    pub fn new(graph_id: GraphId, id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            graph_id,
            name: name.into(),
            group: "default".to_string(),
            severity: Severity::Info,
            urgency: Urgency::Low,
            weight: 1.0,
            state: NodeState::Pending,
            created_at: now,
            updated_at: now,
            state_at: now,
            version: 1,
            owner: String::new(),
            region: String::new(),
            labels: BTreeSet::new(),
            tags: Vec::new(),
            tags_version: 0,
        }
    }

    /// With logical group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// With severity
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// With urgency
    #[inline]
    #[must_use]
    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    /// With weight; negative weights are clamped to zero
    #[inline]
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    /// With lifecycle state
    #[inline]
    #[must_use]
    pub fn with_state(mut self, state: NodeState) -> Self {
        self.state = state;
        self
    }

    /// With owner and region
    #[inline]
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>, region: impl Into<String>) -> Self {
        self.owner = owner.into();
        self.region = region.into();
        self
    }

    /// Add a free-text label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }
}

/// A directed dependency `from -> to` within one graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEdge {
    pub from: NodeId,
    pub to: NodeId,
    /// Intended execution sequence hint
    pub order: u32,
    pub latency_budget_ms: u64,
    pub cost: f64,
    /// Confidence in the dependency, within [0, 1]
    pub confidence: f64,
}

impl CommandEdge {
    /// Create an edge with zero cost and latency and full confidence
    #[must_use]
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            order: 0,
            latency_budget_ms: 0,
            cost: 0.0,
            confidence: 1.0,
        }
    }

    /// With sequence hint
    #[inline]
    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// With latency budget in milliseconds
    #[inline]
    #[must_use]
    pub fn with_latency_budget_ms(mut self, latency_budget_ms: u64) -> Self {
        self.latency_budget_ms = latency_budget_ms;
        self
    }

    /// With resource cost
    #[inline]
    #[must_use]
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// With confidence, clamped to [0, 1]
    #[inline]
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// A computed execution layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandWave {
    pub index: usize,
    pub commands: Vec<CommandNode>,
    /// Ids of the commands in the previous wave; empty for wave 0
    pub depends_on: Vec<NodeId>,
    pub execution_state: ExecutionState,
}

/// Planner bookkeeping carried by a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub source: GraphSource,
    pub revision: u32,
    #[serde(default)]
    pub requested_by: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self {
            source: GraphSource::Planner,
            revision: 1,
            requested_by: String::new(),
            notes: Vec::new(),
        }
    }
}

/// Aggregate root: a recovery operation as a graph of commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandGraph {
    pub id: GraphId,
    pub tenant: String,
    pub run_id: String,
    pub root_plan_id: String,
    pub nodes: Vec<CommandNode>,
    pub edges: Vec<CommandEdge>,
    /// Derived by wave planning; empty until the graph is planned
    #[serde(default)]
    pub waves: Vec<CommandWave>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl CommandGraph {
    /// Create an empty, unplanned graph
    #[must_use]
    pub fn new(
        id: impl Into<GraphId>,
        tenant: impl Into<String>,
        run_id: impl Into<String>,
        root_plan_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant: tenant.into(),
            run_id: run_id.into(),
            root_plan_id: root_plan_id.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            waves: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: GraphMetadata::default(),
        }
    }

    /// With an additional node
    #[inline]
    #[must_use]
    pub fn with_node(mut self, node: CommandNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// With an additional edge
    #[inline]
    #[must_use]
    pub fn with_edge(mut self, edge: CommandEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// With planner metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: GraphMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Look up a node by id
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&CommandNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Whether a node with this id exists
    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges, duplicates included
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Next timestamp for a mutated record: `now`, or one millisecond past
/// `previous` when the wall clock has not moved past it. Saturates at the
/// latest representable instant.
#[must_use]
pub fn advance_clock(previous: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous
        .checked_add_signed(Duration::milliseconds(1))
        .unwrap_or(previous);
    Utc::now().max(floor)
}
