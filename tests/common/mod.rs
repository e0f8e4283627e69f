#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use solfocus_lib::{
    build_service,
    clock::{Clock, ManualClock},
    db::Database,
    drift::{AppActivator, DriftHost, InterventionRequest, InterventionUi},
    events::EventBus,
    models::ActivationEvent,
    scheduler::VirtualScheduler,
    service::FocusService,
    settings::SettingsStore,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

#[derive(Default)]
pub struct RecordingUi {
    pub shown: Mutex<Vec<InterventionRequest>>,
    pub hidden: Mutex<usize>,
}

impl InterventionUi for RecordingUi {
    fn show(&self, request: &InterventionRequest) {
        self.shown.lock().unwrap().push(request.clone());
    }

    fn hide(&self) {
        *self.hidden.lock().unwrap() += 1;
    }
}

#[derive(Default)]
pub struct RecordingActivator {
    pub activated: Mutex<Vec<String>>,
}

impl AppActivator for RecordingActivator {
    fn activate(&self, app_id: &str) {
        self.activated.lock().unwrap().push(app_id.to_string());
    }
}

/// A focus service on virtual time over an in-memory database.
pub struct Rig {
    pub clock: ManualClock,
    pub scheduler: Arc<VirtualScheduler>,
    pub ui: Arc<RecordingUi>,
    pub activator: Arc<RecordingActivator>,
    pub db: Database,
    pub bus: EventBus,
    pub service: FocusService,
    _settings_dir: TempDir,
}

impl Rig {
    pub async fn new() -> Self {
        Self::with_database(Database::open_in_memory().unwrap()).await
    }

    pub async fn with_database(db: Database) -> Self {
        Self::with_database_at(db, t0()).await
    }

    pub async fn with_database_at(db: Database, now: DateTime<Utc>) -> Self {
        let settings_dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::new(settings_dir.path().join("settings.json")).unwrap();

        let clock = ManualClock::new(now);
        let scheduler = Arc::new(VirtualScheduler::new(clock.clone()));
        let ui = Arc::new(RecordingUi::default());
        let activator = Arc::new(RecordingActivator::default());
        let bus = EventBus::new();

        let service = build_service(
            &db,
            &settings,
            scheduler.clone(),
            DriftHost {
                ui: ui.clone(),
                activator: activator.clone(),
            },
            Arc::new(clock.clone()),
            bus.clone(),
        )
        .await
        .unwrap();

        Self {
            clock,
            scheduler,
            ui,
            activator,
            db,
            bus,
            service,
            _settings_dir: settings_dir,
        }
    }

    /// Move virtual time to `t0 + secs`, delivering any timers that came due.
    pub fn advance_to(&mut self, secs: i64) {
        let by = at(secs) - self.clock.now();
        if by <= Duration::zero() {
            return;
        }
        for ticket in self.scheduler.advance(by) {
            self.service.on_timer_fired(ticket);
        }
    }

    pub fn activate(&mut self, secs: i64, app_id: &str, app_name: &str) {
        self.advance_to(secs);
        let event = ActivationEvent::new(at(secs), app_id, app_name, Some("window"));
        self.service.on_activation(&event);
    }

    pub fn shown(&self) -> usize {
        self.ui.shown.lock().unwrap().len()
    }

    pub fn activated(&self) -> Vec<String> {
        self.activator.activated.lock().unwrap().clone()
    }
}
