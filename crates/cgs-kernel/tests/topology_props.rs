use cgs_kernel::audit::{audit_graph, CYCLE_DETECTED};
use cgs_kernel::ledger::{merge_windows, SynthesisWindow};
use cgs_kernel::mutator::normalize_command_graph;
use cgs_kernel::topology::build_topology;
use cgs_kernel::types::{CommandEdge, CommandGraph, GraphId};
use cgs_test_utils::{graph_with, node};
use proptest::prelude::*;

fn forward_edges(n: usize, pairs: Vec<(usize, usize)>) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .filter(|(a, b)| a < &n && b < &n && a != b)
        .map(|(a, b)| (a.min(b), a.max(b)))
        .map(|(a, b)| (format!("n{a}"), format!("n{b}")))
        .collect()
}

fn build(n: usize, edges: &[(String, String)]) -> CommandGraph {
    let ids: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
    let pairs: Vec<(&str, &str)> = edges
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    graph_with(ids.iter().map(|id| node(id)).collect(), &pairs)
}

fn bound(hour: u32) -> String {
    format!("2024-01-{:02}T{:02}:00:00.000Z", 1 + hour / 24, hour % 24)
}

proptest! {
    #[test]
    fn prop_edges_point_into_later_waves(
        n in 1..25usize,
        pairs in proptest::collection::vec((0..25usize, 0..25usize), 0..60)
    ) {
        let edges = forward_edges(n, pairs);
        let graph = build(n, &edges);
        let topology = build_topology(&graph);

        prop_assert_eq!(topology.ordered.len(), n);
        prop_assert!(topology.cycles.is_empty());

        let waves = topology.wave_index();
        for edge in &graph.edges {
            prop_assert!(waves[&edge.from] < waves[&edge.to]);
        }
    }

    #[test]
    fn prop_cycles_drop_nodes_and_are_audited(
        n in 2..20usize,
        pairs in proptest::collection::vec((0..20usize, 0..20usize), 0..40),
        back in (0..20usize, 0..20usize)
    ) {
        let mut edges = forward_edges(n, pairs);
        let (lo, hi) = (back.0 % n, back.1 % n);
        prop_assume!(lo != hi);
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        // Close a cycle lo -> hi -> lo.
        edges.push((format!("n{lo}"), format!("n{hi}")));
        edges.push((format!("n{hi}"), format!("n{lo}")));

        let graph = build(n, &edges);
        let topology = build_topology(&graph);
        prop_assert!(topology.ordered.len() < n);

        let findings = audit_graph(&graph, &topology);
        prop_assert!(findings.iter().any(|f| f.issue.starts_with(CYCLE_DETECTED)));
    }

    #[test]
    fn prop_normalize_is_idempotent(
        names in proptest::collection::vec("[a-d]{1,3}", 1..12),
        orders in proptest::collection::vec((0..4u32, 0..3u64), 0..12)
    ) {
        let mut graph = build(names.len(), &[]);
        for (node, name) in graph.nodes.iter_mut().zip(&names) {
            node.name = name.clone();
        }
        for (i, (order, latency)) in orders.into_iter().enumerate() {
            graph.edges.push(
                CommandEdge::new(format!("n{}", i % names.len()), "n0")
                    .with_order(order)
                    .with_latency_budget_ms(latency),
            );
        }

        let once = normalize_command_graph(&graph);
        let twice = normalize_command_graph(&once);
        prop_assert_eq!(&once.nodes, &twice.nodes);
        prop_assert_eq!(&once.edges, &twice.edges);
        prop_assert!(twice.updated_at > once.updated_at);
    }

    #[test]
    fn prop_merge_covers_both_windows(
        a in (0..48u32, 0..48u32, -5..3000i64),
        b in (0..48u32, 0..48u32, -5..3000i64)
    ) {
        let window = |(x, y, limit): (u32, u32, i64)| SynthesisWindow {
            graph_id: GraphId::from("g"),
            since: bound(x.min(y)),
            until: bound(x.max(y)),
            limit,
        };
        let (a, b) = (window(a), window(b));
        let merged = merge_windows(&a, &b);

        prop_assert!(merged.since <= a.since.clone().min(b.since.clone()));
        prop_assert!(merged.until >= a.until.clone().max(b.until.clone()));
        prop_assert!((1..=2000).contains(&merged.limit));
    }
}
