use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::{AppClassifier, CategoryRule};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DriftSettings {
    /// How long a distraction may hold the foreground before intervening.
    pub threshold_secs: u64,
}

impl Default for DriftSettings {
    fn default() -> Self {
        Self { threshold_secs: 30 }
    }
}

impl DriftSettings {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.threshold_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphSettings {
    /// Silence longer than this closes the active node and records an idle node.
    pub idle_gap_secs: u64,
    /// A→B→A where B is at most this long counts as resuming A.
    pub resume_window_secs: u64,
    /// Closed nodes older than this are dropped from memory (not from storage).
    pub retain_hours: u64,

    /// Focus score weights
    pub weight_duration: f64,
    pub weight_stability: f64,
    pub weight_category: f64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            idle_gap_secs: 300,
            resume_window_secs: 300,
            retain_hours: 24,
            weight_duration: 0.30,
            weight_stability: 0.40,
            weight_category: 0.30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusSettings {
    pub drift: DriftSettings,
    pub graph: GraphSettings,
    pub classifier_rules: Vec<CategoryRule>,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            drift: DriftSettings::default(),
            graph: GraphSettings::default(),
            classifier_rules: AppClassifier::default_rules(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<FocusSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!(
                        "Ignoring malformed settings at {}: {err}",
                        path.display()
                    );
                    FocusSettings::default()
                }
            }
        } else {
            FocusSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> FocusSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn drift(&self) -> DriftSettings {
        self.snapshot().drift
    }

    pub fn graph(&self) -> GraphSettings {
        self.snapshot().graph
    }

    pub fn classifier(&self) -> AppClassifier {
        AppClassifier::new(&self.snapshot().classifier_rules)
    }

    pub fn update(&self, settings: FocusSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &FocusSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::models::ContextType;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        assert_eq!(store.drift().threshold(), Duration::from_secs(30));
        assert_eq!(store.graph().idle_gap_secs, 300);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.snapshot();
        settings.drift.threshold_secs = 45;
        settings.classifier_rules = vec![CategoryRule::new(
            ContextType::Distraction,
            &[],
            &["solitaire"],
        )];
        store.update(settings).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.drift().threshold_secs, 45);
        assert!(reloaded.classifier().is_distraction(None, Some("Solitaire")));
        assert!(!reloaded.classifier().is_distraction(None, Some("Twitter")));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"graph":{"idleGapSecs":60}}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.graph().idle_gap_secs, 60);
        assert_eq!(store.graph().retain_hours, 24);
        assert_eq!(store.drift().threshold_secs, 30);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.snapshot(), FocusSettings::default());
    }
}
