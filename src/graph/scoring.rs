use crate::graph::config::GraphConfig;
use crate::models::ContextType;

/// Inputs for scoring one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeActivity {
    pub context_type: ContextType,
    pub duration_secs: i64,
    pub event_count: u64,
    pub app_switches: u64,
}

/// Focus score as a weighted average of duration, stability and category.
pub fn compute_focus_score(activity: &NodeActivity, config: &GraphConfig) -> f64 {
    let duration_score = score_duration(activity.duration_secs);
    let stability_score = score_stability(activity.event_count, activity.app_switches);
    let category_score = score_category(activity.context_type);

    let score = config.weight_duration * duration_score
        + config.weight_stability * stability_score
        + config.weight_category * category_score;

    score.clamp(0.0, 1.0)
}

/// Score duration using sigmoid function.
/// Target values: 30s≈0.14, 120s=0.5, 300s≈0.97
fn score_duration(duration_secs: i64) -> f64 {
    1.0 / (1.0 + (-0.02 * (duration_secs as f64 - 120.0)).exp())
}

/// 1.0 - (app_switches / event_count)
/// More hopping between apps inside one node = lower stability.
fn score_stability(event_count: u64, app_switches: u64) -> f64 {
    if event_count == 0 {
        return 0.5; // Idle nodes have no events
    }

    let switch_ratio = app_switches as f64 / event_count as f64;
    1.0 - switch_ratio.min(1.0)
}

fn score_category(context_type: ContextType) -> f64 {
    match context_type {
        ContextType::Work => 1.0,
        ContextType::Research => 0.8,
        ContextType::Communication => 0.6,
        ContextType::Idle | ContextType::Unknown => 0.5,
        ContextType::Distraction => 0.0,
    }
}
