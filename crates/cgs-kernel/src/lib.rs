//! CGS Kernel (cgs-kernel)
//!
//! Models a recovery operation as a directed graph of commands and analyses
//! it:
//! 1. **Topology**: adjacency, cycles, topological order, waves
//! 2. **Forecast / Audit**: readiness, cost, risk, structural findings
//! 3. **Synthesis**: one go/no-go result for planners
//! 4. **Mutation / Ledger**: event-emitting rewrites and windowed snapshots
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cgs_kernel::prelude::*;
//!
//! let graph = CommandGraph::new("g-1", "acme", "run-1", "plan-1")
//!     .with_node(CommandNode::new("g-1".into(), "drain", "Drain traffic"))
//!     .with_node(CommandNode::new("g-1".into(), "restore", "Restore replica"))
//!     .with_edge(CommandEdge::new("drain", "restore"));
//!
//! let result = to_synthesis_result(&graph);
//! assert!(result.ready);
//!
//! let ledger = build_ledger(&graph, &LedgerConfig::default(), Vec::new())?;
//! ```

// Model
pub mod error;
pub mod types;

// Analysis
pub mod audit;
pub mod forecast;
pub mod synthesis;
pub mod topology;

// Mutation and bookkeeping
pub mod config;
pub mod journal;
pub mod ledger;
pub mod mutator;

// Boundaries
pub mod export;
pub mod validation;

// Test harness
pub mod harness;

// Re-exports
pub use error::*;
pub use types::*;

/// Common imports
pub mod prelude {
    pub use crate::audit::{audit_graph, AuditFinding};
    pub use crate::config::LedgerConfig;
    pub use crate::error::{MutationError, SynthesisError, WindowError};
    pub use crate::forecast::{forecast, forecast_graph, CommandGraphForecast};
    pub use crate::journal::EventJournal;
    pub use crate::ledger::{
        build_ledger, build_synthesis_snapshot, merge_windows, to_window, validate_window,
        CommandSynthesisRecord, CommandSynthesisSnapshot, ExecutionSample, LedgerRecord,
        SynthesisWindow,
    };
    pub use crate::mutator::{
        add_edge, add_node, normalize_command_graph, remove_node, rewrite_graph, rewrite_with,
        GraphRewrite, NodeRewriter,
    };
    pub use crate::synthesis::{synthesize, to_synthesis_result, CommandSynthesisResult};
    pub use crate::topology::{build_topology, plan_graph, Topology};
    pub use crate::types::{
        CommandEdge, CommandGraph, CommandGraphEvent, CommandNode, CommandWave, GraphEventKind,
        GraphId, NodeId, NodeState, Severity, Urgency,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
