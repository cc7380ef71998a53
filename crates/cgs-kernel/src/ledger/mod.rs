//! Snapshot ledger
//!
//! Point-in-time snapshots of a graph's health, time windows for periodic
//! capture, and the durable records handed to persistence. Records and
//! snapshots are created fresh per call and never edited afterwards.
//!
//! Window bounds are RFC 3339 strings in UTC with millisecond precision.
//! Validation and merging compare them as strings, which orders correctly
//! only while every bound shares that format and timezone.

use crate::config::{LedgerConfig, DEFAULT_SAMPLE_RATE_MS, DEFAULT_WINDOW_MINUTES};
use crate::error::WindowError;
use crate::forecast::percentage;
use crate::synthesis::{synthesize, CommandSynthesisResult};
use crate::types::{
    CommandGraph, CommandGraphEvent, GraphEventKind, GraphId, NodeId, NodeState, Severity,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on a window's sample limit
pub const MAX_WINDOW_LIMIT: i64 = 2000;

/// Render a timestamp in the window bound format
#[must_use]
pub fn format_bound(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Where a snapshot sits in the graph's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisCursor {
    pub graph_id: GraphId,
    /// Node count at capture time
    pub index: usize,
    pub since: String,
    pub until: String,
}

/// Coarse periodic health snapshot of a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSynthesisSnapshot {
    pub cursor: SynthesisCursor,
    pub total_nodes: usize,
    pub blocked_nodes: usize,
    /// 0..=100, see [`snapshot_risk`]
    pub risk_score: u32,
    pub critical_path_length: usize,
    /// Percentage of nodes placed in a planned wave
    pub wave_coverage: u32,
    pub captured_at: DateTime<Utc>,
}

/// A capture window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisWindow {
    pub graph_id: GraphId,
    pub since: String,
    pub until: String,
    pub limit: i64,
}

/// Observed execution of one node, echoed into the ledger untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSample {
    pub node_id: NodeId,
    pub observed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub state: NodeState,
}

/// Durable record of a synthesis outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSynthesisRecord {
    pub record_id: Uuid,
    pub graph_id: GraphId,
    pub tenant: String,
    pub operator: String,
    pub window: SynthesisWindow,
    /// Facade result with `ready` replaced by the ledger's own definition
    pub outcome: CommandSynthesisResult,
    pub risk_score: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Everything one ledger capture produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRecord {
    pub snapshot: CommandSynthesisSnapshot,
    pub event: CommandGraphEvent,
    pub record: CommandSynthesisRecord,
    pub samples: Vec<ExecutionSample>,
}

/// Snapshot risk on a 0..=100 scale.
///
/// `25 × critical + 10 × warning + 15 × blocked − 5 × resolved`, clamped.
#[must_use]
pub fn snapshot_risk(resolved: usize, blocked: usize, warning: usize, critical: usize) -> u32 {
    let raw = 25 * critical as i64 + 10 * warning as i64 + 15 * blocked as i64
        - 5 * resolved as i64;
    raw.clamp(0, 100) as u32
}

/// Read-only projection of a graph's current health
#[must_use]
pub fn build_synthesis_snapshot(graph: &CommandGraph) -> CommandSynthesisSnapshot {
    let count_state =
        |state: NodeState| graph.nodes.iter().filter(|n| n.state == state).count();
    let count_severity =
        |severity: Severity| graph.nodes.iter().filter(|n| n.severity == severity).count();

    let total_nodes = graph.node_count();
    let blocked_nodes = count_state(NodeState::Blocked);
    let risk_score = snapshot_risk(
        count_state(NodeState::Resolved),
        blocked_nodes,
        count_severity(Severity::Warning),
        count_severity(Severity::Critical),
    );
    let planned: usize = graph.waves.iter().map(|wave| wave.commands.len()).sum();

    CommandSynthesisSnapshot {
        cursor: SynthesisCursor {
            graph_id: graph.id.clone(),
            index: total_nodes,
            since: format_bound(graph.created_at),
            until: format_bound(graph.updated_at),
        },
        total_nodes,
        blocked_nodes,
        risk_score,
        critical_path_length: graph.waves.len().max(1),
        wave_coverage: percentage(planned, total_nodes),
        captured_at: Utc::now(),
    }
}

fn effective_minutes(minutes: f64) -> f64 {
    if minutes.is_finite() && minutes > 0.0 {
        minutes
    } else {
        DEFAULT_WINDOW_MINUTES
    }
}

/// Sample limit for a window: `ceil(minutes × 60 000 / rate)`, at most 2000.
/// A zero rate yields 0, which validation rejects.
#[must_use]
pub fn window_limit(minutes: f64, sample_rate_ms: u64) -> i64 {
    if sample_rate_ms == 0 {
        return 0;
    }
    let samples = (effective_minutes(minutes) * 60_000.0 / sample_rate_ms as f64).ceil();
    (samples as i64).min(MAX_WINDOW_LIMIT)
}

/// Window ending now and reaching `minutes` back, sampled at `sample_rate_ms`.
///
/// Fails when the start of the window falls outside the representable time
/// range.
pub fn to_window_sampled(
    graph_id: &GraphId,
    minutes: f64,
    sample_rate_ms: u64,
) -> Result<SynthesisWindow, WindowError> {
    let minutes = effective_minutes(minutes);
    let until = Utc::now();
    let since = Duration::try_milliseconds((minutes * 60_000.0).round() as i64)
        .and_then(|span| until.checked_sub_signed(span))
        .ok_or_else(|| WindowError::SpanOutOfRange {
            graph_id: graph_id.clone(),
            minutes: minutes.to_string(),
        })?;

    Ok(SynthesisWindow {
        graph_id: graph_id.clone(),
        since: format_bound(since),
        until: format_bound(until),
        limit: window_limit(minutes, sample_rate_ms),
    })
}

/// Window ending now; non-positive or non-finite `minutes` means 15
pub fn to_window(graph_id: &GraphId, minutes: f64) -> Result<SynthesisWindow, WindowError> {
    to_window_sampled(graph_id, minutes, DEFAULT_SAMPLE_RATE_MS)
}

/// Accept a window with a positive limit and `since <= until`
pub fn validate_window(window: SynthesisWindow) -> Result<SynthesisWindow, WindowError> {
    if window.limit <= 0 {
        return Err(WindowError::NonPositiveLimit {
            graph_id: window.graph_id,
            limit: window.limit,
        });
    }
    if window.until < window.since {
        return Err(WindowError::InvertedRange {
            graph_id: window.graph_id,
            since: window.since,
            until: window.until,
        });
    }
    Ok(window)
}

/// Union of two windows; limits are summed and clamped to `1..=2000`
#[must_use]
pub fn merge_windows(a: &SynthesisWindow, b: &SynthesisWindow) -> SynthesisWindow {
    SynthesisWindow {
        graph_id: a.graph_id.clone(),
        since: a.since.clone().min(b.since.clone()),
        until: a.until.clone().max(b.until.clone()),
        limit: a.limit.saturating_add(b.limit).clamp(1, MAX_WINDOW_LIMIT),
    }
}

/// Capture a snapshot, its event and a durable record.
///
/// Fails only when the window derived from `config` is invalid. The record's
/// `ready` flag means "no critical node and no blocked node", which is
/// stricter about severity than the facade's flag and ignores cycles.
#[tracing::instrument(skip_all, fields(graph_id = %graph.id, tenant = %config.tenant))]
pub fn build_ledger(
    graph: &CommandGraph,
    config: &LedgerConfig,
    samples: Vec<ExecutionSample>,
) -> Result<LedgerRecord, WindowError> {
    let window = to_window_sampled(&graph.id, config.wave_window_minutes, config.sample_rate_ms)
        .and_then(validate_window)
        .map_err(|err| {
            tracing::warn!("ledger window rejected: {err}");
            err
        })?;

    let snapshot = build_synthesis_snapshot(graph);
    let event = CommandGraphEvent::new(
        GraphEventKind::Snapshot,
        graph.id.clone(),
        format!("{}:snapshot:{}", graph.id, snapshot.cursor.index),
        serde_json::json!({ "snapshot": snapshot, "window": window }),
    );

    let critical = graph
        .nodes
        .iter()
        .filter(|n| n.severity == Severity::Critical)
        .count();
    let mut outcome = synthesize(graph).result;
    outcome.ready = critical == 0 && snapshot.blocked_nodes == 0;

    let record = CommandSynthesisRecord {
        record_id: Uuid::new_v4(),
        graph_id: graph.id.clone(),
        tenant: config.tenant.clone(),
        operator: config.operator.clone(),
        window,
        outcome,
        risk_score: snapshot.risk_score,
        recorded_at: Utc::now(),
    };

    tracing::info!(
        "ledger record {} captured: risk {}, ready {}",
        record.record_id,
        record.risk_score,
        record.outcome.ready
    );

    Ok(LedgerRecord {
        snapshot,
        event,
        record,
        samples,
    })
}
