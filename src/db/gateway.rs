use chrono::{DateTime, Utc};

use super::{
    connection::Database,
    repositories::{
        context_graph::{insert_context_edge, upsert_context_node},
        distractions::insert_distraction_outcome,
        objectives::upsert_objective,
    },
};
use crate::models::{ContextEdge, ContextNode, DistractionOutcome, Objective};

/// Durable storage as seen by the state machines. Every write is
/// fire-and-forget: in-memory state stays authoritative and a failed write
/// is only logged.
pub trait Persistence: Send + Sync {
    fn save_objective(&self, objective: &Objective);
    fn save_context_node(&self, node: &ContextNode, last_event_at: DateTime<Utc>);
    fn save_context_edge(&self, edge: &ContextEdge);
    fn append_distraction_outcome(&self, outcome: &DistractionOutcome);
}

impl Persistence for Database {
    fn save_objective(&self, objective: &Objective) {
        let record = objective.clone();
        self.submit("save objective", move |conn| upsert_objective(conn, &record));
    }

    fn save_context_node(&self, node: &ContextNode, last_event_at: DateTime<Utc>) {
        let record = node.clone();
        self.submit("save context node", move |conn| {
            upsert_context_node(conn, &record, last_event_at)
        });
    }

    fn save_context_edge(&self, edge: &ContextEdge) {
        let record = edge.clone();
        self.submit("save context edge", move |conn| insert_context_edge(conn, &record));
    }

    fn append_distraction_outcome(&self, outcome: &DistractionOutcome) {
        let record = outcome.clone();
        self.submit("append distraction outcome", move |conn| {
            insert_distraction_outcome(conn, &record)
        });
    }
}
