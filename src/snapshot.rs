//! Point-in-time export of the focus core for downstream aggregation
//! (context exports, the HUD, weekly summaries).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    drift::DriftDetector,
    graph::{config::hours_before, ContextGraphBuilder},
    models::{ContextEdge, ContextNode, ContextType, DistractionEvent, Objective},
    objective::ObjectiveLedger,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub taken_at: DateTime<Utc>,
    pub current_objective: Option<Objective>,
    pub active_duration_secs: Option<i64>,
    pub recent_objectives: Vec<Objective>,
    pub drift: DriftState,
    pub monitoring: bool,
    pub active_context: Option<ContextNode>,
    /// Newest first.
    pub recent_contexts: Vec<ContextNode>,
    /// Edges between the recent contexts, oldest first.
    pub edges: Vec<ContextEdge>,
    pub summary: ContextSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftState {
    pub intervention_visible: bool,
    pub distraction: Option<DistractionEvent>,
    pub tracked_app: Option<String>,
    pub previous_work_app: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub window_hours: i64,
    pub context_count: usize,
    /// Temporal edges inside the window.
    pub context_switches: usize,
    /// Mean focus score of non-idle contexts, `None` when there are none.
    pub average_focus_score: Option<f64>,
    pub seconds_by_type: BTreeMap<String, i64>,
}

const RECENT_OBJECTIVES: usize = 10;

impl FocusSnapshot {
    pub fn capture(
        ledger: &ObjectiveLedger,
        drift: &DriftDetector,
        graph: &ContextGraphBuilder,
        now: DateTime<Utc>,
        hours: i64,
    ) -> Self {
        let recent: Vec<ContextNode> = graph.recent_contexts(hours).into_iter().cloned().collect();
        let edges: Vec<ContextEdge> = graph
            .edges()
            .iter()
            .filter(|edge| {
                recent.iter().any(|n| n.id == edge.from_context_id)
                    && recent.iter().any(|n| n.id == edge.to_context_id)
            })
            .cloned()
            .collect();
        let summary = summarize(&recent, &edges, now, hours);

        Self {
            taken_at: now,
            current_objective: ledger.current_objective().cloned(),
            active_duration_secs: ledger.active_duration().map(|d| d.num_seconds()),
            recent_objectives: ledger.history().iter().take(RECENT_OBJECTIVES).cloned().collect(),
            drift: DriftState {
                intervention_visible: drift.is_intervention_visible(),
                distraction: drift.current_distraction().cloned(),
                tracked_app: drift.tracked_app().map(str::to_string),
                previous_work_app: drift.previous_work_app().map(str::to_string),
            },
            monitoring: graph.is_monitoring(),
            active_context: graph.active_context().cloned(),
            recent_contexts: recent,
            edges,
            summary,
        }
    }
}

fn summarize(nodes: &[ContextNode], edges: &[ContextEdge], now: DateTime<Utc>, hours: i64) -> ContextSummary {
    let window_start = hours_before(now, hours);

    let mut seconds_by_type: BTreeMap<String, i64> = BTreeMap::new();
    for node in nodes {
        let start = node.start_time.max(window_start);
        let end = node.end_time.unwrap_or(now).min(now);
        let secs = (end - start).num_seconds().max(0);
        *seconds_by_type.entry(node.context_type.as_str().to_string()).or_insert(0) += secs;
    }

    let scored: Vec<f64> = nodes
        .iter()
        .filter(|n| n.context_type != ContextType::Idle)
        .map(|n| n.focus_score)
        .collect();
    let average_focus_score = if scored.is_empty() {
        None
    } else {
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    };

    ContextSummary {
        window_hours: hours,
        context_count: nodes.len(),
        context_switches: edges.iter().filter(|e| !e.edge_type.is_cross_link()).count(),
        average_focus_score,
        seconds_by_type,
    }
}
