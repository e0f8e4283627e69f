use std::sync::Arc;

use crate::{
    clock::Clock,
    drift::{DriftDetector, InterventionChoice},
    events::EventBus,
    graph::ContextGraphBuilder,
    models::{ActivationEvent, ContextEdge, EdgeType, Objective},
    objective::ObjectiveLedger,
    scheduler::TimerTicket,
    snapshot::FocusSnapshot,
};

use super::commands::{Command, Reply};
use super::runner::DEFAULT_SNAPSHOT_HOURS;

/// Single owner of the ledger, the drift detector and the context graph.
///
/// Every input (activation, user command, fired timer) goes through one
/// `&mut self` method, so the three components never observe each other
/// half-updated.
pub struct FocusService {
    ledger: ObjectiveLedger,
    drift: DriftDetector,
    graph: ContextGraphBuilder,
    clock: Arc<dyn Clock>,
    bus: EventBus,
}

impl FocusService {
    pub fn new(
        ledger: ObjectiveLedger,
        drift: DriftDetector,
        graph: ContextGraphBuilder,
        clock: Arc<dyn Clock>,
        bus: EventBus,
    ) -> Self {
        Self {
            ledger,
            drift,
            graph,
            clock,
            bus,
        }
    }

    pub fn ledger(&self) -> &ObjectiveLedger {
        &self.ledger
    }

    pub fn drift(&self) -> &DriftDetector {
        &self.drift
    }

    pub fn graph(&self) -> &ContextGraphBuilder {
        &self.graph
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn on_activation(&mut self, event: &ActivationEvent) {
        self.graph.record(event);
        self.drift.on_activation(event, &self.ledger);
    }

    pub fn on_timer_fired(&mut self, ticket: TimerTicket) -> bool {
        self.drift.on_timer_fired(ticket, &self.ledger)
    }

    pub fn set_objective(&mut self, text: impl Into<String>) -> Objective {
        let objective = self.ledger.set_objective(text).clone();
        self.drift.sync_with_ledger(&self.ledger);
        objective
    }

    pub fn pause(&mut self) -> bool {
        let changed = self.ledger.pause();
        self.drift.sync_with_ledger(&self.ledger);
        changed
    }

    pub fn resume(&mut self) -> bool {
        let changed = self.ledger.resume();
        self.drift.sync_with_ledger(&self.ledger);
        changed
    }

    pub fn complete(&mut self) -> bool {
        let changed = self.ledger.complete();
        self.drift.sync_with_ledger(&self.ledger);
        changed
    }

    pub fn abandon(&mut self) -> bool {
        let changed = self.ledger.abandon();
        self.drift.sync_with_ledger(&self.ledger);
        changed
    }

    pub fn resume_work(&mut self) -> bool {
        self.choose(InterventionChoice::ResumeWork)
    }

    pub fn take_break(&mut self) -> bool {
        self.choose(InterventionChoice::TakeBreak)
    }

    pub fn handle_key(&mut self, key: &str) -> bool {
        let handled = self.drift.handle_key(key, &mut self.ledger);
        self.drift.sync_with_ledger(&self.ledger);
        handled
    }

    pub fn start_monitoring(&mut self) {
        self.graph.start_monitoring();
    }

    pub fn stop_monitoring(&mut self) {
        self.graph.stop_monitoring();
    }

    pub fn suspend(&mut self) {
        self.graph.suspend();
    }

    pub fn link_screenshot(&mut self, filename: &str) -> bool {
        self.graph.link_screenshot(filename)
    }

    pub fn link_clipboard(&mut self, item_hash: &str) -> bool {
        self.graph.link_clipboard(item_hash)
    }

    pub fn link_note(&mut self, note_id: &str) -> bool {
        self.graph.link_note(note_id)
    }

    pub fn link_contexts(&mut self, from: &str, to: &str, edge_type: EdgeType) -> Option<ContextEdge> {
        self.graph.link_contexts(from, to, edge_type)
    }

    pub fn snapshot(&self, hours: i64) -> FocusSnapshot {
        FocusSnapshot::capture(&self.ledger, &self.drift, &self.graph, self.clock.now(), hours)
    }

    pub fn handle(&mut self, command: Command) -> Reply {
        let ack = |accepted: bool| Reply::Ack { accepted };
        match command {
            Command::Activation(event) => {
                self.on_activation(&event);
                ack(true)
            }
            Command::SetObjective { text } => Reply::ObjectiveStarted {
                objective: self.set_objective(text),
            },
            Command::Pause => ack(self.pause()),
            Command::Resume => ack(self.resume()),
            Command::Complete => ack(self.complete()),
            Command::Abandon => ack(self.abandon()),
            Command::ResumeWork => ack(self.resume_work()),
            Command::TakeBreak => ack(self.take_break()),
            Command::Key { key } => ack(self.handle_key(&key)),
            Command::StartMonitoring => {
                self.start_monitoring();
                ack(true)
            }
            Command::StopMonitoring => {
                self.stop_monitoring();
                ack(true)
            }
            Command::Suspend => {
                self.suspend();
                ack(true)
            }
            Command::LinkScreenshot { filename } => ack(self.link_screenshot(&filename)),
            Command::LinkClipboard { hash } => ack(self.link_clipboard(&hash)),
            Command::LinkNote { note_id } => ack(self.link_note(&note_id)),
            Command::LinkContexts { from, to, edge_type } => Reply::ContextLinked {
                edge: self.link_contexts(&from, &to, edge_type),
            },
            Command::Snapshot { hours } => Reply::Snapshot {
                snapshot: Box::new(self.snapshot(hours.unwrap_or(DEFAULT_SNAPSHOT_HOURS))),
            },
            Command::Shutdown => {
                self.stop_monitoring();
                Reply::ShuttingDown
            }
        }
    }

    fn choose(&mut self, choice: InterventionChoice) -> bool {
        let handled = self.drift.choose(choice, &mut self.ledger);
        self.drift.sync_with_ledger(&self.ledger);
        handled
    }
}
