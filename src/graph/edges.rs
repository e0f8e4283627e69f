use crate::graph::config::GraphConfig;
use crate::models::{ContextNode, ContextType, EdgeType};

/// How the graph got from `closing` into a new node of type `next`.
///
/// `history` holds the closed nodes before `closing`, oldest first. Rules are
/// checked in order:
///
/// 1. A→B→A where B lasted at most the resume window: `ResumedFrom`.
/// 2. Entering a distraction: `InterruptedBy`.
/// 3. Leaving a distraction back to the last focused type: `ResumedFrom`.
/// 4. Anything else: `TransitionedTo`.
pub fn classify_transition(
    history: &[ContextNode],
    closing: &ContextNode,
    next: ContextType,
    now: chrono::DateTime<chrono::Utc>,
    config: &GraphConfig,
) -> EdgeType {
    if let Some(before) = history.last() {
        let contiguous = before.end_time == Some(closing.start_time);
        if contiguous
            && before.context_type == next
            && closing.duration(now) <= config.resume_window
        {
            return EdgeType::ResumedFrom;
        }
    }

    if next.is_distraction() {
        return EdgeType::InterruptedBy;
    }

    if closing.context_type.is_distraction() && last_focused_type(history) == Some(next) {
        return EdgeType::ResumedFrom;
    }

    EdgeType::TransitionedTo
}

/// Most recent type that was neither a distraction nor idle.
fn last_focused_type(history: &[ContextNode]) -> Option<ContextType> {
    history
        .iter()
        .rev()
        .map(|node| node.context_type)
        .find(|t| !t.is_distraction() && *t != ContextType::Idle)
}
