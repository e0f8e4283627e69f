use std::{collections::VecDeque, sync::Arc};

use anyhow::Result;
use chrono::Duration;
use log::{info, warn};

use crate::{
    clock::Clock,
    db::{Database, Persistence},
    events::{EventBus, FocusEvent},
    models::{EndReason, Objective},
};

/// Ended objectives kept in memory, most recent first.
pub const HISTORY_LIMIT: usize = 50;

/// Owner of the single current objective and the recent history.
///
/// State machine: `None -> Active <-> Paused -> Ended`. Operations that do not
/// apply in the current state are silent no-ops and report `false`.
pub struct ObjectiveLedger {
    current: Option<Objective>,
    history: VecDeque<Objective>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Persistence>,
    bus: EventBus,
}

impl ObjectiveLedger {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn Persistence>, bus: EventBus) -> Self {
        Self {
            current: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            clock,
            store,
            bus,
        }
    }

    /// Load the open objective and recent history from storage.
    ///
    /// If a crash left several open rows behind, the newest one stays current
    /// and each older one is ended as superseded at its successor's start.
    pub async fn restore(
        db: &Database,
        clock: Arc<dyn Clock>,
        store: Arc<dyn Persistence>,
        bus: EventBus,
    ) -> Result<Self> {
        let mut open = db.get_open_objectives().await?;
        let mut ledger = Self::new(clock, store, bus);

        if !open.is_empty() {
            let current = open.remove(0);
            let mut successor_start = current.start_time;
            for stale in open {
                warn!(
                    "Found stale open objective {}; ending it as superseded",
                    stale.id
                );
                db.end_objective(&stale.id, EndReason::NewObjective, successor_start)
                    .await?;
                successor_start = stale.start_time;
            }
            info!("Restored current objective {}", current.id);
            ledger.current = Some(current);
        }

        ledger.history = db
            .list_ended_objectives(HISTORY_LIMIT)
            .await?
            .into_iter()
            .collect();

        Ok(ledger)
    }

    pub fn current_objective(&self) -> Option<&Objective> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &VecDeque<Objective> {
        &self.history
    }

    /// Active time of the current objective, `None` when there is none.
    pub fn active_duration(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.current.as_ref().map(|o| o.active_duration(now))
    }

    /// True while an objective is open and not paused.
    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(Objective::is_running)
    }

    pub fn set_objective(&mut self, text: impl Into<String>) -> &Objective {
        self.end_current(EndReason::NewObjective);

        let objective = Objective::new(text, self.clock.now());
        info!("Objective {} started", objective.id);
        self.store.save_objective(&objective);
        self.bus.emit(FocusEvent::ObjectiveChanged {
            objective: Some(objective.clone()),
        });

        self.current.insert(objective)
    }

    pub fn pause(&mut self) -> bool {
        let now = self.clock.now();
        let Some(objective) = self.current.as_mut() else {
            return false;
        };
        if !objective.pause(now) {
            return false;
        }

        self.store.save_objective(objective);
        self.emit_changed();
        true
    }

    pub fn resume(&mut self) -> bool {
        let now = self.clock.now();
        let Some(objective) = self.current.as_mut() else {
            return false;
        };
        if !objective.resume(now) {
            return false;
        }

        self.store.save_objective(objective);
        self.emit_changed();
        true
    }

    pub fn complete(&mut self) -> bool {
        let ended = self.end_current(EndReason::Completed);
        if ended {
            self.emit_changed();
        }
        ended
    }

    pub fn abandon(&mut self) -> bool {
        let ended = self.end_current(EndReason::Abandoned);
        if ended {
            self.emit_changed();
        }
        ended
    }

    fn end_current(&mut self, reason: EndReason) -> bool {
        let Some(mut objective) = self.current.take() else {
            return false;
        };

        objective.finish(reason, self.clock.now());
        info!("Objective {} ended ({})", objective.id, reason.as_str());
        self.store.save_objective(&objective);
        self.bus.emit(FocusEvent::ObjectiveEnded {
            objective: objective.clone(),
        });

        self.history.push_front(objective);
        self.history.truncate(HISTORY_LIMIT);
        true
    }

    fn emit_changed(&self) {
        self.bus.emit(FocusEvent::ObjectiveChanged {
            objective: self.current.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::drain;
    use crate::testutil::{t0, RecordingStore};

    fn ledger() -> (ObjectiveLedger, ManualClock, Arc<RecordingStore>) {
        let clock = ManualClock::new(t0());
        let store = Arc::new(RecordingStore::default());
        let ledger = ObjectiveLedger::new(Arc::new(clock.clone()), store.clone(), EventBus::new());
        (ledger, clock, store)
    }

    #[test]
    fn pause_resume_complete_accounts_paused_time() {
        let (mut ledger, clock, _) = ledger();
        ledger.set_objective("Fix auth bug");

        clock.set(t0() + Duration::seconds(10));
        assert!(ledger.pause());
        clock.set(t0() + Duration::seconds(40));
        assert!(ledger.resume());
        clock.set(t0() + Duration::seconds(100));
        assert!(ledger.complete());

        let ended = &ledger.history()[0];
        assert_eq!(ended.total_paused(), Duration::seconds(30));
        assert_eq!(ended.active_duration(clock.now()), Duration::seconds(70));
        assert_eq!(ended.end_reason, Some(EndReason::Completed));
        assert!(ledger.current_objective().is_none());
    }

    #[test]
    fn paused_time_only_grows() {
        let (mut ledger, clock, _) = ledger();
        ledger.set_objective("Write docs");

        let mut expected = 0;
        let mut last_total = 0;
        for (pause_at, resume_at) in [(5, 8), (20, 20), (30, 95), (100, 101)] {
            clock.set(t0() + Duration::seconds(pause_at));
            ledger.pause();
            clock.set(t0() + Duration::seconds(resume_at));
            ledger.resume();

            expected += (resume_at - pause_at) * 1000;
            let total = ledger.current_objective().unwrap().total_paused_ms;
            assert_eq!(total, expected as u64);
            assert!(total >= last_total);
            last_total = total;
        }
    }

    #[test]
    fn invalid_operations_are_no_ops() {
        let (mut ledger, _, store) = ledger();
        assert!(!ledger.pause());
        assert!(!ledger.resume());
        assert!(!ledger.complete());
        assert!(!ledger.abandon());
        assert!(store.objectives().is_empty());

        ledger.set_objective("Review PR");
        assert!(!ledger.resume());
        assert!(ledger.pause());
        assert!(!ledger.pause());
        assert_eq!(store.objectives().len(), 2);
    }

    #[test]
    fn new_objective_supersedes_current() {
        let (mut ledger, clock, store) = ledger();
        let first_id = ledger.set_objective("First").id.clone();
        clock.advance(Duration::minutes(3));
        ledger.set_objective("Second");

        assert_eq!(ledger.current_objective().unwrap().text, "Second");
        assert_eq!(ledger.history()[0].id, first_id);
        assert_eq!(ledger.history()[0].end_reason, Some(EndReason::NewObjective));

        let open_rows: Vec<_> = store
            .latest_objectives()
            .into_iter()
            .filter(|o| o.end_time.is_none())
            .collect();
        assert_eq!(open_rows.len(), 1);
    }

    #[test]
    fn abandon_while_paused_folds_pause() {
        let (mut ledger, clock, _) = ledger();
        ledger.set_objective("Refactor");
        clock.set(t0() + Duration::seconds(60));
        ledger.pause();
        clock.set(t0() + Duration::seconds(90));
        ledger.abandon();

        let ended = &ledger.history()[0];
        assert_eq!(ended.end_reason, Some(EndReason::Abandoned));
        assert_eq!(ended.total_paused_ms, 30_000);
        assert!(!ended.is_paused);
    }

    #[test]
    fn history_is_capped_and_newest_first() {
        let (mut ledger, clock, _) = ledger();
        for i in 0..(HISTORY_LIMIT + 5) {
            ledger.set_objective(format!("objective {i}"));
            clock.advance(Duration::seconds(1));
        }
        ledger.complete();

        assert_eq!(ledger.history().len(), HISTORY_LIMIT);
        assert_eq!(
            ledger.history()[0].text,
            format!("objective {}", HISTORY_LIMIT + 4)
        );
    }

    #[test]
    fn active_duration_tracks_clock_while_running() {
        let (mut ledger, clock, _) = ledger();
        assert!(ledger.active_duration().is_none());

        ledger.set_objective("Ship release");
        clock.advance(Duration::minutes(2));
        assert_eq!(ledger.active_duration(), Some(Duration::minutes(2)));

        ledger.pause();
        clock.advance(Duration::minutes(5));
        assert_eq!(ledger.active_duration(), Some(Duration::minutes(2)));
        assert!(!ledger.is_running());
    }

    #[test]
    fn lifecycle_changes_are_published() {
        let (mut ledger, _, _) = ledger();
        let mut rx = ledger.bus.subscribe();

        ledger.set_objective("Plan sprint");
        ledger.complete();

        let names: Vec<_> = drain(&mut rx).iter().map(FocusEvent::name).collect();
        assert_eq!(
            names,
            vec!["objective-changed", "objective-ended", "objective-changed"]
        );
    }

    #[tokio::test]
    async fn restore_keeps_newest_open_and_ends_stale_rows() {
        let db = Database::open_in_memory().unwrap();
        let clock = ManualClock::new(t0());
        let bus = EventBus::new();
        {
            let store: Arc<dyn Persistence> = Arc::new(db.clone());
            let stale = Objective::new("stale", t0());
            let current = Objective::new("current", t0() + Duration::minutes(10));
            store.save_objective(&stale);
            store.save_objective(&current);
        }

        let ledger = ObjectiveLedger::restore(
            &db,
            Arc::new(clock),
            Arc::new(db.clone()),
            bus,
        )
        .await
        .unwrap();

        assert_eq!(ledger.current_objective().unwrap().text, "current");
        assert_eq!(ledger.history().len(), 1);
        assert_eq!(ledger.history()[0].text, "stale");
        assert_eq!(ledger.history()[0].end_reason, Some(EndReason::NewObjective));
        assert_eq!(
            ledger.history()[0].end_time,
            Some(t0() + Duration::minutes(10))
        );
    }
}
