//! Objective data model.
//!
//! An `Objective` is the user's stated intention plus its time accounting.
//! Only the ledger mutates it; once `end_time` is set it never changes again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    Completed,
    Abandoned,
    NewObjective,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::Abandoned => "abandoned",
            EndReason::NewObjective => "newObjective",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(EndReason::Completed),
            "abandoned" => Some(EndReason::Abandoned),
            "newObjective" => Some(EndReason::NewObjective),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    pub text: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub end_reason: Option<EndReason>,
    pub is_paused: bool,
    /// Set iff `is_paused`.
    pub pause_start_time: Option<DateTime<Utc>>,
    /// Sum of completed pause intervals.
    pub total_paused_ms: u64,
}

impl Objective {
    pub fn new(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            start_time: now,
            end_time: None,
            end_reason: None,
            is_paused: false,
            pause_start_time: None,
            total_paused_ms: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Open and not paused.
    pub fn is_running(&self) -> bool {
        self.is_open() && !self.is_paused
    }

    pub fn total_paused(&self) -> Duration {
        Duration::milliseconds(self.total_paused_ms.min(i64::MAX as u64) as i64)
    }

    /// `(end ?? now) - start - totalPaused - openPause`, never negative.
    pub fn active_duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end_time.unwrap_or(now);
        let open_pause = match (self.is_paused, self.pause_start_time) {
            (true, Some(paused_at)) => (end - paused_at).max(Duration::zero()),
            _ => Duration::zero(),
        };

        let active = end - self.start_time - self.total_paused() - open_pause;
        active.max(Duration::zero())
    }

    pub(crate) fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_open() || self.is_paused {
            return false;
        }
        self.is_paused = true;
        self.pause_start_time = Some(now);
        true
    }

    pub(crate) fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_open() || !self.is_paused {
            return false;
        }
        self.fold_open_pause(now);
        true
    }

    pub(crate) fn finish(&mut self, reason: EndReason, now: DateTime<Utc>) {
        if !self.is_open() {
            return;
        }
        if self.is_paused {
            self.fold_open_pause(now);
        }
        self.end_time = Some(now);
        self.end_reason = Some(reason);
    }

    fn fold_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.pause_start_time.take() {
            let paused_ms = (now - paused_at).num_milliseconds().max(0) as u64;
            self.total_paused_ms = self.total_paused_ms.saturating_add(paused_ms);
        }
        self.is_paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn active_duration_excludes_open_pause() {
        let mut objective = Objective::new("write report", t0());
        assert!(objective.pause(t0() + Duration::seconds(20)));

        let now = t0() + Duration::seconds(50);
        assert_eq!(objective.active_duration(now), Duration::seconds(20));
    }

    #[test]
    fn finish_folds_pause_in_progress() {
        let mut objective = Objective::new("write report", t0());
        objective.pause(t0() + Duration::seconds(10));
        objective.finish(EndReason::Abandoned, t0() + Duration::seconds(25));

        assert!(!objective.is_paused);
        assert!(objective.pause_start_time.is_none());
        assert_eq!(objective.total_paused_ms, 15_000);
        assert_eq!(
            objective.active_duration(t0() + Duration::hours(3)),
            Duration::seconds(10)
        );
    }

    #[test]
    fn ended_objective_ignores_pause_and_resume() {
        let mut objective = Objective::new("x", t0());
        objective.finish(EndReason::Completed, t0() + Duration::seconds(5));

        assert!(!objective.pause(t0() + Duration::seconds(6)));
        assert!(!objective.resume(t0() + Duration::seconds(7)));
        assert_eq!(objective.end_reason, Some(EndReason::Completed));
    }

    #[test]
    fn end_reason_round_trips_through_str() {
        for reason in [EndReason::Completed, EndReason::Abandoned, EndReason::NewObjective] {
            assert_eq!(EndReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(EndReason::parse("finished"), None);
    }
}
