use chrono::{DateTime, Duration, Utc};

use crate::settings::GraphSettings;

/// Upper bound on `retain_hours`, roughly a century.
const MAX_RETAIN_HOURS: u64 = 24 * 365 * 100;

/// Tunable thresholds for building the context graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Silence longer than this ends the active node and inserts an idle node
    pub idle_gap: Duration,

    /// Revisit window: A→B→A where B is at most this long resumes A
    pub resume_window: Duration,

    /// Closed nodes older than this are pruned from memory
    pub retain: Duration,

    /// Focus scoring weights
    pub weight_duration: f64,
    pub weight_stability: f64,
    pub weight_category: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from(&GraphSettings::default())
    }
}

impl From<&GraphSettings> for GraphConfig {
    fn from(settings: &GraphSettings) -> Self {
        Self {
            idle_gap: secs(settings.idle_gap_secs),
            resume_window: secs(settings.resume_window_secs),
            retain: secs(settings.retain_hours.min(MAX_RETAIN_HOURS) * 3600),
            weight_duration: settings.weight_duration,
            weight_stability: settings.weight_stability,
            weight_category: settings.weight_category,
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

/// Start of the window of length `span` ending at `end`. Saturates at the
/// earliest representable instant.
pub fn window_start(end: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    end.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Start of the last `hours` before `end`. Negative counts are empty windows
/// and counts too large for a `Duration` cover everything.
pub fn hours_before(end: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    match Duration::try_hours(hours.max(0)) {
        Some(span) => window_start(end, span),
        None => DateTime::<Utc>::MIN_UTC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::t0;

    #[test]
    fn retain_is_clamped_for_huge_settings() {
        let settings = GraphSettings {
            retain_hours: u64::MAX,
            ..GraphSettings::default()
        };
        let config = GraphConfig::from(&settings);
        assert_eq!(config.retain, Duration::hours(MAX_RETAIN_HOURS as i64));
        assert!(window_start(t0(), config.retain) < t0());
    }

    #[test]
    fn window_saturates_instead_of_overflowing() {
        assert_eq!(hours_before(t0(), 4), t0() - Duration::hours(4));
        assert_eq!(hours_before(t0(), -3), t0());
        assert_eq!(hours_before(t0(), 3_000_000_000), DateTime::<Utc>::MIN_UTC);
        assert_eq!(hours_before(t0(), i64::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(t0(), Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
