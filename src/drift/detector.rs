use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::{
    classifier::Classifier,
    clock::Clock,
    db::Persistence,
    events::{EventBus, FocusEvent},
    models::{ActivationEvent, DistractionEvent, DistractionOutcome},
    objective::ObjectiveLedger,
    scheduler::{Scheduler, TimerTicket},
};

use super::intervention::{DriftHost, InterventionChoice, InterventionRequest};
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// A distraction that holds the foreground while its timer runs.
struct Tracking {
    app_name: String,
    started_at: DateTime<Utc>,
    ticket: TimerTicket,
    cancel: CancellationToken,
}

/// Raised intervention awaiting the user's answer.
struct Intervention {
    distraction: DistractionEvent,
    objective_id: String,
}

/// Watches foreground activations and raises an intervention when a
/// distraction app stays in front for longer than the threshold while an
/// objective is running.
///
/// At most one timer is armed at a time. A timer that fires after it was
/// cancelled is recognised by its stale ticket and ignored.
pub struct DriftDetector {
    threshold: Duration,
    classifier: Arc<dyn Classifier>,
    scheduler: Arc<dyn Scheduler>,
    host: DriftHost,
    store: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
    bus: EventBus,

    tracking: Option<Tracking>,
    intervention: Option<Intervention>,
    previous_work_app: Option<String>,
    next_ticket: u64,
}

impl DriftDetector {
    pub fn new(
        threshold: Duration,
        classifier: Arc<dyn Classifier>,
        scheduler: Arc<dyn Scheduler>,
        host: DriftHost,
        store: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
        bus: EventBus,
    ) -> Self {
        Self {
            threshold,
            classifier,
            scheduler,
            host,
            store,
            clock,
            bus,
            tracking: None,
            intervention: None,
            previous_work_app: None,
            next_ticket: 0,
        }
    }

    /// The episode behind the visible intervention, if any.
    pub fn current_distraction(&self) -> Option<&DistractionEvent> {
        self.intervention.as_ref().map(|i| &i.distraction)
    }

    pub fn is_intervention_visible(&self) -> bool {
        self.intervention.is_some()
    }

    /// App the user should be sent back to on "resume work".
    pub fn previous_work_app(&self) -> Option<&str> {
        self.previous_work_app.as_deref()
    }

    /// Distraction app whose timer is currently armed.
    pub fn tracked_app(&self) -> Option<&str> {
        self.tracking.as_ref().map(|t| t.app_name.as_str())
    }

    pub fn on_activation(&mut self, event: &ActivationEvent, ledger: &ObjectiveLedger) {
        if event.is_malformed() {
            log_warn!("Dropping activation without app name or id");
            return;
        }

        if !ledger.is_running() {
            self.clear_tracking();
            return;
        }

        let app_id = event.app_id();
        let app_name = event.app_name();

        if self.classifier.is_distraction(app_id, app_name) {
            // Hopping between distraction apps keeps the original episode.
            if self.tracking.is_some() || self.intervention.is_some() {
                return;
            }
            let label = event.display_name().unwrap_or_default().to_string();
            self.start_tracking(label);
        } else {
            self.clear_tracking();
            if let Some(key) = event.app_key() {
                self.previous_work_app = Some(key.to_string());
            }
        }
    }

    /// Called by the control loop for every expired timer ticket.
    pub fn on_timer_fired(&mut self, ticket: TimerTicket, ledger: &ObjectiveLedger) -> bool {
        let is_current = self
            .tracking
            .as_ref()
            .is_some_and(|tracking| tracking.ticket == ticket);
        if !is_current {
            log_debug!("Ignoring stale drift timer {:?}", ticket);
            return false;
        }
        let Some(tracking) = self.tracking.take() else {
            return false;
        };

        let Some(objective) = ledger.current_objective().filter(|o| o.is_running()) else {
            return false;
        };

        let distraction = DistractionEvent {
            distraction_app: tracking.app_name,
            objective_text: objective.text.clone(),
            start_time: tracking.started_at,
        };

        log_info!(
            "Drift detected: {} in front for {}s",
            distraction.distraction_app,
            self.threshold.as_secs()
        );

        self.host.ui.show(&InterventionRequest::new(distraction.clone()));
        self.bus.emit(FocusEvent::DriftInterventionRequested {
            distraction: distraction.clone(),
        });
        self.intervention = Some(Intervention {
            distraction,
            objective_id: objective.id.clone(),
        });
        true
    }

    /// "Back to work": log a recovery and bring the last work app forward.
    pub fn resume_work(&mut self) -> bool {
        let Some(outcome) = self.resolve_intervention(true) else {
            return false;
        };

        if let Some(app) = self.previous_work_app.clone() {
            self.host.activator.activate(&app);
            self.bus.emit(FocusEvent::ReactivateAppRequested { app_id: app });
        }

        log_info!("Recovered from {} after {}s", outcome.app_name, outcome.duration_secs);
        true
    }

    /// "Taking a break": log the outcome and pause the objective.
    pub fn acknowledge_break(&mut self, ledger: &mut ObjectiveLedger) -> bool {
        let Some(outcome) = self.resolve_intervention(false) else {
            return false;
        };

        ledger.pause();
        log_info!("Break taken after {}s on {}", outcome.duration_secs, outcome.app_name);
        true
    }

    pub fn choose(&mut self, choice: InterventionChoice, ledger: &mut ObjectiveLedger) -> bool {
        match choice {
            InterventionChoice::ResumeWork => self.resume_work(),
            InterventionChoice::TakeBreak => self.acknowledge_break(ledger),
        }
    }

    /// Keyboard shortcut for the two buttons. Ignored without a visible modal.
    pub fn handle_key(&mut self, key: &str, ledger: &mut ObjectiveLedger) -> bool {
        if !self.is_intervention_visible() {
            return false;
        }
        match InterventionChoice::from_key(key) {
            Some(choice) => self.choose(choice, ledger),
            None => false,
        }
    }

    /// Reconcile with the ledger after any objective change. A paused or
    /// ended objective stops tracking and silently closes the modal; so does
    /// replacing the objective the modal was raised for.
    pub fn sync_with_ledger(&mut self, ledger: &ObjectiveLedger) {
        if !ledger.is_running() {
            self.clear_tracking();
            self.dismiss();
            return;
        }

        let current_id = ledger.current_objective().map(|o| o.id.as_str());
        let stale = self
            .intervention
            .as_ref()
            .is_some_and(|i| Some(i.objective_id.as_str()) != current_id);
        if stale {
            self.dismiss();
        }
    }

    fn start_tracking(&mut self, app_name: String) {
        self.clear_tracking();

        self.next_ticket += 1;
        let ticket = TimerTicket(self.next_ticket);
        let cancel = self.scheduler.schedule(self.threshold, ticket);

        log_debug!("Tracking distraction {} ({:?})", app_name, ticket);
        self.tracking = Some(Tracking {
            app_name,
            started_at: self.clock.now(),
            ticket,
            cancel,
        });
    }

    fn clear_tracking(&mut self) {
        if let Some(tracking) = self.tracking.take() {
            tracking.cancel.cancel();
        }
    }

    fn resolve_intervention(&mut self, recovered: bool) -> Option<DistractionOutcome> {
        let intervention = self.intervention.take()?;
        self.host.ui.hide();

        let outcome = DistractionOutcome::resolve(
            &intervention.distraction,
            Some(intervention.objective_id),
            self.clock.now(),
            recovered,
        );
        self.store.append_distraction_outcome(&outcome);
        self.bus.emit(FocusEvent::DistractionResolved {
            outcome: outcome.clone(),
        });
        self.bus.emit(FocusEvent::DriftInterventionDismissed);
        Some(outcome)
    }

    fn dismiss(&mut self) {
        if self.intervention.take().is_some() {
            self.host.ui.hide();
            self.bus.emit(FocusEvent::DriftInterventionDismissed);
        }
    }
}
