use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::{
    classifier::Classifier,
    clock::Clock,
    db::{Database, Persistence},
    events::{EventBus, FocusEvent},
    graph::{
        config::{hours_before, window_start, GraphConfig},
        edges::classify_transition,
        scoring::{compute_focus_score, NodeActivity},
    },
    models::{ActivationEvent, ContextEdge, ContextNode, ContextType, EdgeType},
};
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

const IDLE_LABEL: &str = "Idle";

/// Running counters for the active node.
struct ActiveSession {
    last_event_at: DateTime<Utc>,
    last_app: Option<String>,
    app_switches: u64,
}

/// Turns the activation stream into a time-ordered chain of context nodes
/// joined by typed edges.
///
/// At most one node is open at a time and it is always the last entry of
/// `nodes`. Closed nodes are contiguous unless monitoring was stopped or
/// suspended in between.
pub struct ContextGraphBuilder {
    config: GraphConfig,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Persistence>,
    bus: EventBus,

    monitoring: bool,
    nodes: Vec<ContextNode>,
    edges: Vec<ContextEdge>,
    active: Option<ActiveSession>,
    last_event_at: Option<DateTime<Utc>>,
}

impl ContextGraphBuilder {
    pub fn new(
        config: GraphConfig,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn Persistence>,
        bus: EventBus,
    ) -> Self {
        Self {
            config,
            classifier,
            clock,
            store,
            bus,
            monitoring: false,
            nodes: Vec::new(),
            edges: Vec::new(),
            active: None,
            last_event_at: None,
        }
    }

    /// Rebuild the in-memory window from storage.
    ///
    /// Nodes left open by a crash are closed at their last recorded event.
    pub async fn restore(
        db: &Database,
        config: GraphConfig,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn Persistence>,
        bus: EventBus,
    ) -> Result<Self> {
        let since = window_start(clock.now(), config.retain);
        let stored = db.get_context_nodes_since(since).await?;
        let mut builder = Self::new(config, classifier, clock, store, bus);

        for mut entry in stored {
            if entry.node.end_time.is_none() {
                let end = entry.last_event_at.max(entry.node.start_time);
                log_warn!("Closing dangling context node {} at {}", entry.node.id, end);
                entry.node.end_time = Some(end);
                builder.store.save_context_node(&entry.node, entry.last_event_at);
            }
            builder.last_event_at = builder.last_event_at.max(Some(entry.last_event_at));
            builder.nodes.push(entry.node);
        }

        let edges = db.get_context_edges_since(since).await?;
        builder.edges = edges
            .into_iter()
            .filter(|edge| builder.has_node(&edge.from_context_id) && builder.has_node(&edge.to_context_id))
            .collect();

        log_info!(
            "Restored {} context nodes and {} edges",
            builder.nodes.len(),
            builder.edges.len()
        );
        Ok(builder)
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub fn start_monitoring(&mut self) {
        if !self.monitoring {
            log_info!("Context monitoring started");
        }
        self.monitoring = true;
    }

    /// Stop accepting events and close the active node now.
    pub fn stop_monitoring(&mut self) {
        if !self.monitoring {
            return;
        }
        let now = self.clock.now();
        let end = self.last_event_at.map_or(now, |last| last.max(now));
        self.close_active(end);
        self.monitoring = false;
        log_info!("Context monitoring stopped");
    }

    /// System sleep: close the active node at its last event, keep monitoring.
    pub fn suspend(&mut self) {
        if let Some(last) = self.active.as_ref().map(|s| s.last_event_at) {
            self.close_active(last);
            log_info!("Suspended; active context closed at {}", last);
        }
    }

    /// Fold one activation into the graph. Returns whether it was accepted.
    pub fn record(&mut self, event: &ActivationEvent) -> bool {
        if !self.monitoring {
            return false;
        }
        if event.is_malformed() {
            log_warn!("Dropping activation without app name or id");
            return false;
        }
        if let Some(last) = self.last_event_at {
            if event.timestamp < last {
                log_warn!(
                    "Dropping out-of-order activation at {} (last {})",
                    event.timestamp,
                    last
                );
                return false;
            }
        }

        let at = event.timestamp;
        let category = self.classifier.classify(event.app_id(), event.app_name());

        match self.active.as_ref().map(|s| s.last_event_at) {
            None => self.open_node(category, event, None),
            Some(last) if at - last > self.config.idle_gap => {
                self.close_active(last);
                let idle_id = self.insert_idle(last, at);
                self.open_node(category, event, Some(idle_id));
            }
            Some(_) => {
                let current_type = self.nodes.last().map(|n| n.context_type);
                let boundary = category != ContextType::Unknown && current_type != Some(category);
                if boundary {
                    let previous = self.close_active(at);
                    self.open_node(category, event, previous);
                } else {
                    self.extend_active(event);
                }
            }
        }

        self.last_event_at = Some(at);
        self.prune();
        true
    }

    pub fn link_screenshot(&mut self, filename: &str) -> bool {
        self.link_artifact(|node| node.screenshot_filenames.insert(filename.to_string()))
    }

    pub fn link_clipboard(&mut self, item_hash: &str) -> bool {
        self.link_artifact(|node| node.clipboard_item_hashes.insert(item_hash.to_string()))
    }

    pub fn link_note(&mut self, note_id: &str) -> bool {
        self.link_artifact(|node| node.note_ids.insert(note_id.to_string()))
    }

    /// Add a non-temporal relation between two known nodes.
    pub fn link_contexts(&mut self, from: &str, to: &str, edge_type: EdgeType) -> Option<ContextEdge> {
        if !edge_type.is_cross_link() || from == to {
            return None;
        }
        if !self.has_node(from) || !self.has_node(to) {
            return None;
        }
        let edge = ContextEdge::new(from, to, edge_type, self.clock.now());
        self.push_edge(edge.clone());
        Some(edge)
    }

    pub fn active_context(&self) -> Option<&ContextNode> {
        self.nodes.last().filter(|node| node.is_active())
    }

    /// Nodes intersecting the last `hours`, newest first.
    pub fn recent_contexts(&self, hours: i64) -> Vec<&ContextNode> {
        let now = self.clock.now();
        let to = self.last_event_at.map_or(now, |last| last.max(now));
        let from = hours_before(now, hours);
        self.nodes
            .iter()
            .rev()
            .filter(|node| node.intersects(from, to, to))
            .collect()
    }

    pub fn nodes(&self) -> &[ContextNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ContextEdge] {
        &self.edges
    }

    pub fn edges_for(&self, node_id: &str) -> Vec<&ContextEdge> {
        self.edges.iter().filter(|edge| edge.touches(node_id)).collect()
    }

    fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    fn open_node(&mut self, category: ContextType, event: &ActivationEvent, previous: Option<String>) {
        let at = event.timestamp;
        let label = event.display_name().unwrap_or_default();
        let mut node = ContextNode::open(category, label, at);
        node.event_count = 1;
        let app = event.app_key().map(str::to_string);
        if let Some(app) = &app {
            node.apps.insert(app.clone());
        }
        if let Some(title) = event.window_title() {
            node.window_titles.insert(title.to_string());
        }
        node.focus_score = self.score(&node, 0, at);

        if let Some(previous_id) = previous {
            let edge_type = self.transition_into(&previous_id, category, at);
            self.push_edge(ContextEdge::new(&previous_id, &node.id, edge_type, at));
        }

        log_debug!("Opened {} context {}", category.as_str(), node.id);
        self.store.save_context_node(&node, at);
        self.bus.emit(FocusEvent::ContextNodeOpened { node: node.clone() });
        self.active = Some(ActiveSession {
            last_event_at: at,
            last_app: app,
            app_switches: 0,
        });
        self.nodes.push(node);
    }

    fn extend_active(&mut self, event: &ActivationEvent) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        let app = event.app_key().map(str::to_string);
        if app.is_some() && app != session.last_app {
            session.app_switches += 1;
            session.last_app = app.clone();
        }
        session.last_event_at = event.timestamp;
        let switches = session.app_switches;

        let Some(mut node) = self.nodes.pop() else {
            return;
        };
        node.event_count += 1;
        if let Some(app) = app {
            node.apps.insert(app);
        }
        if let Some(title) = event.window_title() {
            node.window_titles.insert(title.to_string());
        }
        node.focus_score = self.score(&node, switches, event.timestamp);
        self.store.save_context_node(&node, event.timestamp);
        self.nodes.push(node);
    }

    /// Close the active node at `at`; returns its id.
    fn close_active(&mut self, at: DateTime<Utc>) -> Option<String> {
        let session = self.active.take()?;
        let mut node = self.nodes.pop()?;
        let end = at.max(node.start_time);
        node.end_time = Some(end);
        node.focus_score = self.score(&node, session.app_switches, end);

        self.store.save_context_node(&node, session.last_event_at);
        self.bus.emit(FocusEvent::ContextNodeClosed { node: node.clone() });
        let id = node.id.clone();
        self.nodes.push(node);
        Some(id)
    }

    /// Record a closed idle node covering `[from, to)` after the node that
    /// just closed; returns its id.
    fn insert_idle(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
        let previous = self.nodes.last().map(|node| node.id.clone());

        let mut idle = ContextNode::open(ContextType::Idle, IDLE_LABEL, from);
        idle.end_time = Some(to);
        idle.focus_score = self.score(&idle, 0, to);

        if let Some(previous_id) = previous {
            self.push_edge(ContextEdge::new(&previous_id, &idle.id, EdgeType::TransitionedTo, from));
        }

        log_debug!("Idle from {} to {}", from, to);
        self.store.save_context_node(&idle, from);
        self.bus.emit(FocusEvent::ContextNodeOpened { node: idle.clone() });
        self.bus.emit(FocusEvent::ContextNodeClosed { node: idle.clone() });
        let id = idle.id.clone();
        self.nodes.push(idle);
        id
    }

    fn transition_into(&self, previous_id: &str, next: ContextType, at: DateTime<Utc>) -> EdgeType {
        let Some(index) = self.nodes.iter().rposition(|node| node.id == previous_id) else {
            return EdgeType::TransitionedTo;
        };
        classify_transition(&self.nodes[..index], &self.nodes[index], next, at, &self.config)
    }

    fn push_edge(&mut self, edge: ContextEdge) {
        self.store.save_context_edge(&edge);
        self.bus.emit(FocusEvent::ContextEdgeCreated { edge: edge.clone() });
        self.edges.push(edge);
    }

    fn link_artifact<F: FnOnce(&mut ContextNode) -> bool>(&mut self, attach: F) -> bool {
        let Some(last_event_at) = self.active.as_ref().map(|s| s.last_event_at) else {
            return false;
        };
        let Some(node) = self.nodes.last_mut() else {
            return false;
        };
        if attach(node) {
            self.store.save_context_node(node, last_event_at);
        }
        true
    }

    fn score(&self, node: &ContextNode, app_switches: u64, at: DateTime<Utc>) -> f64 {
        let activity = NodeActivity {
            context_type: node.context_type,
            duration_secs: node.duration(at).num_seconds(),
            event_count: node.event_count,
            app_switches,
        };
        compute_focus_score(&activity, &self.config)
    }

    /// Drop closed nodes older than the retention window, and any edge that
    /// would dangle without them.
    fn prune(&mut self) {
        let cutoff = window_start(self.clock.now(), self.config.retain);
        let before = self.nodes.len();
        self.nodes
            .retain(|node| node.end_time.map_or(true, |end| end >= cutoff));
        if self.nodes.len() == before {
            return;
        }

        let nodes = &self.nodes;
        self.edges.retain(|edge| {
            nodes.iter().any(|n| n.id == edge.from_context_id)
                && nodes.iter().any(|n| n.id == edge.to_context_id)
        });
        log_debug!("Pruned {} context nodes", before - self.nodes.len());
    }
}
