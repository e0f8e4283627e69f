//! Context graph data models.
//!
//! A `ContextNode` is one coherent stretch of activity; a `ContextEdge` is a
//! directed relationship between two nodes.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Work,
    Communication,
    Research,
    Distraction,
    Idle,
    Unknown,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::Work => "work",
            ContextType::Communication => "communication",
            ContextType::Research => "research",
            ContextType::Distraction => "distraction",
            ContextType::Idle => "idle",
            ContextType::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "work" => Some(ContextType::Work),
            "communication" => Some(ContextType::Communication),
            "research" => Some(ContextType::Research),
            "distraction" => Some(ContextType::Distraction),
            "idle" => Some(ContextType::Idle),
            "unknown" => Some(ContextType::Unknown),
            _ => None,
        }
    }

    pub fn is_distraction(&self) -> bool {
        matches!(self, ContextType::Distraction)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EdgeType {
    TransitionedTo,
    InterruptedBy,
    ResumedFrom,
    Spawned,
    Related,
    ParentChild,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::TransitionedTo => "transitionedTo",
            EdgeType::InterruptedBy => "interruptedBy",
            EdgeType::ResumedFrom => "resumedFrom",
            EdgeType::Spawned => "spawned",
            EdgeType::Related => "related",
            EdgeType::ParentChild => "parentChild",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "transitionedTo" => Some(EdgeType::TransitionedTo),
            "interruptedBy" => Some(EdgeType::InterruptedBy),
            "resumedFrom" => Some(EdgeType::ResumedFrom),
            "spawned" => Some(EdgeType::Spawned),
            "related" => Some(EdgeType::Related),
            "parentChild" => Some(EdgeType::ParentChild),
            _ => None,
        }
    }

    /// Edge types that only explicit content-linking may create.
    pub fn is_cross_link(&self) -> bool {
        matches!(
            self,
            EdgeType::Spawned | EdgeType::Related | EdgeType::ParentChild
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextNode {
    pub id: String,
    #[serde(rename = "type")]
    pub context_type: ContextType,
    pub label: String,
    pub start_time: DateTime<Utc>,
    /// `None` while this is the active node.
    pub end_time: Option<DateTime<Utc>>,
    pub focus_score: f64,
    pub event_count: u64,
    pub apps: BTreeSet<String>,
    pub window_titles: BTreeSet<String>,
    pub clipboard_item_hashes: BTreeSet<String>,
    pub screenshot_filenames: BTreeSet<String>,
    pub note_ids: BTreeSet<String>,
}

impl ContextNode {
    pub fn open(context_type: ContextType, label: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context_type,
            label: label.into(),
            start_time: start,
            end_time: None,
            focus_score: 0.0,
            event_count: 0,
            apps: BTreeSet::new(),
            window_titles: BTreeSet::new(),
            clipboard_item_hashes: BTreeSet::new(),
            screenshot_filenames: BTreeSet::new(),
            note_ids: BTreeSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        (self.end_time.unwrap_or(now) - self.start_time).max(Duration::zero())
    }

    /// Whether `[start, end ?? now]` intersects `[from, to]`.
    pub fn intersects(&self, from: DateTime<Utc>, to: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let end = self.end_time.unwrap_or(now);
        self.start_time <= to && end >= from
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextEdge {
    pub id: String,
    pub from_context_id: String,
    pub to_context_id: String,
    pub edge_type: EdgeType,
    pub timestamp: DateTime<Utc>,
}

impl ContextEdge {
    pub fn new(from: &str, to: &str, edge_type: EdgeType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from_context_id: from.to_string(),
            to_context_id: to.to_string(),
            edge_type,
            timestamp,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from_context_id == node_id || self.to_context_id == node_id
    }
}
