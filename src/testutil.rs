//! Recording fakes shared by unit tests.

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    db::Persistence,
    drift::{AppActivator, InterventionRequest, InterventionUi},
    models::{ContextEdge, ContextNode, DistractionOutcome, Objective},
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

#[derive(Default)]
pub struct RecordingStore {
    objectives: Mutex<Vec<Objective>>,
    nodes: Mutex<Vec<ContextNode>>,
    edges: Mutex<Vec<ContextEdge>>,
    outcomes: Mutex<Vec<DistractionOutcome>>,
}

impl RecordingStore {
    /// Every objective write, in order.
    pub fn objectives(&self) -> Vec<Objective> {
        self.objectives.lock().unwrap().clone()
    }

    /// Last written version of each objective row.
    pub fn latest_objectives(&self) -> Vec<Objective> {
        latest_by_id(self.objectives(), |o| o.id.clone())
    }

    pub fn latest_nodes(&self) -> Vec<ContextNode> {
        latest_by_id(self.nodes.lock().unwrap().clone(), |n| n.id.clone())
    }

    pub fn edges(&self) -> Vec<ContextEdge> {
        self.edges.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<DistractionOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

fn latest_by_id<T, F: Fn(&T) -> String>(rows: Vec<T>, key: F) -> Vec<T> {
    let mut latest: Vec<T> = Vec::new();
    for row in rows {
        match latest.iter().position(|existing| key(existing) == key(&row)) {
            Some(index) => latest[index] = row,
            None => latest.push(row),
        }
    }
    latest
}

impl Persistence for RecordingStore {
    fn save_objective(&self, objective: &Objective) {
        self.objectives.lock().unwrap().push(objective.clone());
    }

    fn save_context_node(&self, node: &ContextNode, _last_event_at: DateTime<Utc>) {
        self.nodes.lock().unwrap().push(node.clone());
    }

    fn save_context_edge(&self, edge: &ContextEdge) {
        self.edges.lock().unwrap().push(edge.clone());
    }

    fn append_distraction_outcome(&self, outcome: &DistractionOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    Show(InterventionRequest),
    Hide,
}

#[derive(Default)]
pub struct RecordingUi {
    calls: Mutex<Vec<UiCall>>,
}

impl RecordingUi {
    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shown(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, UiCall::Show(_)))
            .count()
    }
}

impl InterventionUi for RecordingUi {
    fn show(&self, request: &InterventionRequest) {
        self.calls.lock().unwrap().push(UiCall::Show(request.clone()));
    }

    fn hide(&self) {
        self.calls.lock().unwrap().push(UiCall::Hide);
    }
}

#[derive(Default)]
pub struct RecordingActivator {
    activated: Mutex<Vec<String>>,
}

impl RecordingActivator {
    pub fn activated(&self) -> Vec<String> {
        self.activated.lock().unwrap().clone()
    }
}

impl AppActivator for RecordingActivator {
    fn activate(&self, app_id: &str) {
        self.activated.lock().unwrap().push(app_id.to_string());
    }
}
