use cgs_kernel::config::LedgerConfig;
use cgs_kernel::journal::{verify_chain, EventJournal};
use cgs_kernel::ledger::build_ledger;
use cgs_kernel::mutator::{
    add_edge, add_node, normalize_command_graph, remove_node, rewrite_graph, rewrite_with,
};
use cgs_kernel::topology::plan_graph;
use cgs_kernel::types::{CommandEdge, CommandNode, GraphEventKind, NodeId, NodeState};
use cgs_kernel::{BoxError, JournalError, MutationError};
use cgs_test_utils::{chain_graph, instant, node};
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_resolve_all_then_journal() {
    let graph = plan_graph(&chain_graph(&["a", "b", "c"]));

    let rewrite = rewrite_graph(
        &graph,
        &rewrite_with(|node: CommandNode| async move {
            Ok::<_, BoxError>(node.with_state(NodeState::Resolved))
        }),
    )
    .await
    .unwrap();

    assert_eq!(rewrite.events.len(), 3);
    assert!(rewrite
        .graph
        .nodes
        .iter()
        .all(|n| n.state == NodeState::Resolved && n.version == 2 && n.state_at > instant(0)));
    assert_eq!(rewrite.graph.waves, graph.waves);
    assert!(rewrite.graph.updated_at > graph.updated_at);

    let journal = EventJournal::new();
    journal.extend(rewrite.events);
    let ledger = build_ledger(&rewrite.graph, &LedgerConfig::default(), Vec::new()).unwrap();
    journal.append(ledger.event);

    assert_eq!(journal.len(), 4);
    journal.verify_integrity().unwrap();

    let kinds: Vec<GraphEventKind> = journal.entries().iter().map(|e| e.event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            GraphEventKind::NodeStateChanged,
            GraphEventKind::NodeStateChanged,
            GraphEventKind::NodeStateChanged,
            GraphEventKind::Snapshot,
        ]
    );
    assert_eq!(journal.entries()[1].event.trace_id, "graph-test:2:b");
    assert!(ledger.record.outcome.ready);
    assert_eq!(ledger.record.risk_score, 0);
}

#[tokio::test]
async fn test_failing_rewrite_returns_no_graph() {
    let graph = chain_graph(&["a", "b", "c"]);

    let err = rewrite_graph(
        &graph,
        &rewrite_with(|node: CommandNode| async move {
            if node.id.as_str() == "b" {
                Err::<CommandNode, BoxError>("executor offline".into())
            } else {
                Ok(node)
            }
        }),
    )
    .await
    .unwrap_err();

    match err {
        MutationError::NodeRewriteFailed { node_id, .. } => assert_eq!(node_id, NodeId::from("b")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_structural_edits_emit_events() {
    let graph = chain_graph(&["a", "b"]);

    let added = add_node(&graph, node("c")).unwrap();
    let linked = add_edge(&added.graph, CommandEdge::new("b", "c"));
    let removed = remove_node(&linked.graph, &NodeId::from("b")).unwrap();

    assert_eq!(removed.graph.node_count(), 2);
    assert_eq!(removed.graph.edge_count(), 0);
    assert_eq!(removed.events[0].payload["dropped_edges"].as_u64(), Some(2));

    let journal = EventJournal::new();
    for rewrite in [added, linked, removed] {
        journal.extend(rewrite.events);
    }
    assert_eq!(journal.len(), 3);
    journal.verify_integrity().unwrap();
}

#[test]
fn test_tampered_journal_is_detected() {
    let graph = chain_graph(&["a"]);
    let journal = EventJournal::new();
    journal.extend(add_node(&graph, node("b")).unwrap().events);
    journal.extend(add_node(&graph, node("c")).unwrap().events);

    let mut entries = journal.entries();
    entries[0].event.trace_id = "forged".to_string();

    assert_eq!(
        verify_chain(&entries),
        Err(JournalError::IntegrityViolation { sequence: 0 })
    );
}

#[test]
fn test_edits_at_latest_instant_do_not_overflow() {
    let mut graph = chain_graph(&["a", "b"]);
    graph.updated_at = DateTime::<Utc>::MAX_UTC;

    assert_eq!(normalize_command_graph(&graph).updated_at, DateTime::<Utc>::MAX_UTC);
    assert_eq!(plan_graph(&graph).updated_at, DateTime::<Utc>::MAX_UTC);
    let added = add_node(&graph, node("c")).unwrap();
    assert_eq!(added.graph.updated_at, DateTime::<Utc>::MAX_UTC);
}
