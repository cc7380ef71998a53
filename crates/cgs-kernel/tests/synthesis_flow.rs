use cgs_kernel::audit::{GRAPH_EMPTY, NO_WAVE_PLANNED};
use cgs_kernel::config::LedgerConfig;
use cgs_kernel::forecast::forecast;
use cgs_kernel::ledger::{build_ledger, validate_window, SynthesisWindow};
use cgs_kernel::synthesis::{synthesize, to_synthesis_result};
use cgs_kernel::topology::{build_topology, plan_graph};
use cgs_kernel::types::{GraphEventKind, GraphId, NodeId, NodeState, Severity};
use cgs_kernel::{ConfigError, WindowError};
use cgs_test_utils::{chain_graph, cycle_graph, diamond_graph, empty_graph, node_with};
use pretty_assertions::assert_eq;
use std::io::Write;

fn ids(list: &[&str]) -> Vec<NodeId> {
    list.iter().map(|id| NodeId::from(*id)).collect()
}

#[test]
fn test_four_node_chain_end_to_end() {
    let graph = chain_graph(&["A", "B", "C", "D"]);
    let topology = build_topology(&graph);
    let outlook = forecast(&graph, &topology);
    let result = to_synthesis_result(&graph);

    assert_eq!(outlook.wave_count, 4);
    assert_eq!(outlook.blockers, 0);
    assert_eq!(result.execution_order, ids(&["A", "B", "C", "D"]));
    assert!(result.ready);
    assert_eq!(result.forecast_minutes, 1);
    assert_eq!(result.conflicts, vec![NO_WAVE_PLANNED.to_string()]);
}

#[test]
fn test_planned_chain_has_no_conflicts() {
    let graph = plan_graph(&chain_graph(&["A", "B", "C", "D"]));
    assert_eq!(graph.waves.len(), 4);

    let result = to_synthesis_result(&graph);
    assert!(result.conflicts.is_empty());
    assert!(result.ready);
}

#[test]
fn test_blocker_makes_graph_not_ready() {
    let mut graph = diamond_graph();
    graph.nodes[1] = node_with("b", Severity::Info, NodeState::Deferred);

    let report = synthesize(&graph);
    assert_eq!(report.breakdown.forecast.blockers, 1);
    assert_eq!(report.result.execution_order.len(), 4);
    assert!(!report.result.ready);
}

#[test]
fn test_cycle_makes_graph_not_ready() {
    let report = synthesize(&cycle_graph());

    assert_eq!(report.breakdown.forecast.blockers, 0);
    assert!(report.result.execution_order.is_empty());
    assert!(!report.result.ready);
    assert_eq!(
        &report.result.conflicts[1..],
        &[
            "cycle-detected:a->b->c->a".to_string(),
            "cycle-detected:b->c->a->b".to_string(),
            "cycle-detected:c->a->b->c".to_string(),
        ]
    );
}

#[test]
fn test_empty_graph() {
    let graph = empty_graph();
    let topology = build_topology(&graph);
    assert!(topology.ordered.is_empty());
    assert_eq!(topology.layers, vec![Vec::<NodeId>::new()]);

    let result = to_synthesis_result(&graph);
    assert!(result.ready);
    assert_eq!(result.readiness_score, 0);
    assert_eq!(
        result.conflicts,
        vec![GRAPH_EMPTY.to_string(), NO_WAVE_PLANNED.to_string()]
    );
}

#[test]
fn test_window_validity() {
    let window = |since: &str, until: &str| SynthesisWindow {
        graph_id: GraphId::from("g"),
        since: since.to_string(),
        until: until.to_string(),
        limit: 10,
    };

    let inverted = window("2024-01-02T00:00:00Z", "2024-01-01T00:00:00Z");
    assert!(matches!(
        validate_window(inverted),
        Err(WindowError::InvertedRange { .. })
    ));

    let ordered = window("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z");
    assert_eq!(validate_window(ordered.clone()), Ok(ordered));
}

#[test]
fn test_ledger_record_for_critical_graph() {
    let mut graph = chain_graph(&["a", "b"]);
    graph.nodes[0] = node_with("a", Severity::Critical, NodeState::Active);

    let config = LedgerConfig::new().with_tenant("acme").with_operator("oncall");
    let ledger = build_ledger(&graph, &config, Vec::new()).unwrap();

    assert_eq!(ledger.snapshot.risk_score, 25);
    assert_eq!(ledger.record.risk_score, 25);
    assert_eq!(ledger.record.tenant, "acme");
    assert_eq!(ledger.record.operator, "oncall");
    assert_eq!(ledger.record.window.limit, 15);
    assert!(!ledger.record.outcome.ready);
    assert_eq!(ledger.event.kind, GraphEventKind::Snapshot);
    assert_eq!(ledger.event.trace_id, "graph-test:snapshot:2");
}

#[test]
fn test_zero_sample_rate_rejects_ledger() {
    let config = LedgerConfig::new().with_sample_rate_ms(0);
    let err = build_ledger(&chain_graph(&["a"]), &config, Vec::new()).unwrap_err();
    assert!(matches!(err, WindowError::NonPositiveLimit { limit: 0, .. }));
}

#[test]
fn test_config_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "tenant = \"acme\"\nwave_window_minutes = 30.0").unwrap();

    let config = LedgerConfig::load(file.path()).unwrap();
    assert_eq!(config.tenant, "acme");
    assert_eq!(config.operator, "system");
    assert_eq!(config.sample_rate_ms, 60_000);

    let ledger = build_ledger(&chain_graph(&["a"]), &config, Vec::new()).unwrap();
    assert_eq!(ledger.record.window.limit, 30);
}

#[test]
fn test_config_rejects_blank_operator() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "operator = \"  \"").unwrap();

    let err = LedgerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "operator", .. }));
}
