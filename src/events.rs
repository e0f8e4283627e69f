//! Typed event fan-out for observers of the focus core (HUD, menu bar,
//! context export). Built on a broadcast channel: `emit` never blocks and a
//! receiver that falls behind is lagged rather than slowing the control loop.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{ContextEdge, ContextNode, DistractionEvent, DistractionOutcome, Objective};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FocusEvent {
    /// Current objective after a lifecycle change; `None` once it ended.
    ObjectiveChanged { objective: Option<Objective> },
    ObjectiveEnded { objective: Objective },
    ContextNodeOpened { node: ContextNode },
    ContextNodeClosed { node: ContextNode },
    ContextEdgeCreated { edge: ContextEdge },
    DriftInterventionRequested { distraction: DistractionEvent },
    DriftInterventionDismissed,
    DistractionResolved { outcome: DistractionOutcome },
    ReactivateAppRequested { app_id: String },
}

impl FocusEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FocusEvent::ObjectiveChanged { .. } => "objective-changed",
            FocusEvent::ObjectiveEnded { .. } => "objective-ended",
            FocusEvent::ContextNodeOpened { .. } => "context-node-opened",
            FocusEvent::ContextNodeClosed { .. } => "context-node-closed",
            FocusEvent::ContextEdgeCreated { .. } => "context-edge-created",
            FocusEvent::DriftInterventionRequested { .. } => "drift-intervention-requested",
            FocusEvent::DriftInterventionDismissed => "drift-intervention-dismissed",
            FocusEvent::DistractionResolved { .. } => "distraction-resolved",
            FocusEvent::ReactivateAppRequested { .. } => "reactivate-app-requested",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FocusEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many subscribers received the event.
    pub fn emit(&self, event: FocusEvent) -> usize {
        log::debug!("emit {}", event.name());
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FocusEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain everything currently queued on a receiver. Lagged gaps are skipped.
pub fn drain(rx: &mut broadcast::Receiver<FocusEvent>) -> Vec<FocusEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}
