use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The drift episode behind a visible intervention. Discarded once resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistractionEvent {
    pub distraction_app: String,
    pub objective_text: String,
    pub start_time: DateTime<Utc>,
}

impl DistractionEvent {
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        (now - self.start_time).max(Duration::zero())
    }
}

/// Row appended to the distraction log when an intervention is resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistractionOutcome {
    pub id: String,
    pub objective_id: Option<String>,
    pub objective_text: String,
    pub app_name: String,
    pub started_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub recovered: bool,
}

impl DistractionOutcome {
    pub fn resolve(
        event: &DistractionEvent,
        objective_id: Option<String>,
        resolved_at: DateTime<Utc>,
        recovered: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            objective_id,
            objective_text: event.objective_text.clone(),
            app_name: event.distraction_app.clone(),
            started_at: event.start_time,
            resolved_at,
            duration_secs: event.duration(resolved_at).num_seconds(),
            recovered,
        }
    }
}
