use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One foreground change reported by the activity source.
///
/// Every field but the timestamp may be missing when the active-window query
/// fails; empty strings are treated the same as missing values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivationEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub window_title: Option<String>,
}

impl ActivationEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        app_id: &str,
        app_name: &str,
        window_title: Option<&str>,
    ) -> Self {
        Self {
            timestamp,
            app_id: Some(app_id.to_string()),
            app_name: Some(app_name.to_string()),
            window_title: window_title.map(str::to_string),
        }
    }

    pub fn app_id(&self) -> Option<&str> {
        non_empty(self.app_id.as_deref())
    }

    pub fn app_name(&self) -> Option<&str> {
        non_empty(self.app_name.as_deref())
    }

    pub fn window_title(&self) -> Option<&str> {
        non_empty(self.window_title.as_deref())
    }

    /// Stable identity for the app: bundle id when known, display name otherwise.
    pub fn app_key(&self) -> Option<&str> {
        self.app_id().or_else(|| self.app_name())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.app_name().or_else(|| self.app_id())
    }

    /// True when there is nothing to classify.
    pub fn is_malformed(&self) -> bool {
        self.app_key().is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
