//! App categorisation policy.
//!
//! Both the drift detector ("is this a distraction?") and the graph builder
//! ("which kind of session is this?") consume the same `Classifier`, so the
//! matching rules can be swapped without touching either state machine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::ContextType;

pub trait Classifier: Send + Sync {
    fn classify(&self, app_id: Option<&str>, app_name: Option<&str>) -> ContextType;

    fn is_distraction(&self, app_id: Option<&str>, app_name: Option<&str>) -> bool {
        self.classify(app_id, app_name).is_distraction()
    }
}

/// Exact bundle ids plus case-insensitive substrings of the display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRule {
    pub category: ContextType,
    #[serde(default)]
    pub app_ids: Vec<String>,
    #[serde(default)]
    pub name_keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: ContextType, app_ids: &[&str], name_keywords: &[&str]) -> Self {
        Self {
            category,
            app_ids: app_ids.iter().map(|id| id.to_string()).collect(),
            name_keywords: name_keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

struct CompiledRule {
    category: ContextType,
    app_ids: HashSet<String>,
    name_keywords: Vec<String>,
}

impl CompiledRule {
    fn matches(&self, app_id: Option<&str>, lowered_name: Option<&str>) -> bool {
        if let Some(id) = app_id {
            if self.app_ids.contains(id) {
                return true;
            }
        }

        match lowered_name {
            Some(name) => self
                .name_keywords
                .iter()
                .any(|keyword| name.contains(keyword.as_str())),
            None => false,
        }
    }
}

/// First matching rule wins; anything unmatched is `Unknown`.
pub struct AppClassifier {
    rules: Vec<CompiledRule>,
}

impl AppClassifier {
    pub fn new(rules: &[CategoryRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                category: rule.category,
                app_ids: rule.app_ids.iter().cloned().collect(),
                name_keywords: rule
                    .name_keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();

        Self { rules }
    }

    pub fn default_rules() -> Vec<CategoryRule> {
        vec![
            CategoryRule::new(
                ContextType::Distraction,
                &[
                    "com.twitter.twitter-mac",
                    "com.atebits.Tweetie2",
                    "com.hnc.Discord",
                    "com.netflix.Netflix",
                    "com.valvesoftware.steam",
                ],
                &[
                    "twitter", "youtube", "reddit", "facebook", "instagram", "tiktok", "netflix",
                    "discord", "twitch", "steam",
                ],
            ),
            CategoryRule::new(
                ContextType::Communication,
                &[
                    "com.tinyspeck.slackmacgap",
                    "com.apple.mail",
                    "com.apple.MobileSMS",
                    "us.zoom.xos",
                    "com.microsoft.teams2",
                ],
                &["slack", "mail", "messages", "zoom", "teams", "outlook", "telegram", "whatsapp"],
            ),
            CategoryRule::new(
                ContextType::Research,
                &[
                    "com.apple.Safari",
                    "com.google.Chrome",
                    "org.mozilla.firefox",
                    "company.thebrowser.Browser",
                ],
                &["safari", "chrome", "firefox", "preview", "books"],
            ),
            CategoryRule::new(
                ContextType::Work,
                &[
                    "com.apple.dt.Xcode",
                    "com.microsoft.VSCode",
                    "com.apple.Terminal",
                    "com.googlecode.iterm2",
                    "com.todesktop.230313mzl4w4u92",
                ],
                &[
                    "xcode", "code", "terminal", "iterm", "cursor", "intellij", "pycharm", "figma",
                    "notion", "obsidian", "sublime",
                ],
            ),
        ]
    }
}

impl Default for AppClassifier {
    fn default() -> Self {
        Self::new(&Self::default_rules())
    }
}

impl Classifier for AppClassifier {
    fn classify(&self, app_id: Option<&str>, app_name: Option<&str>) -> ContextType {
        let lowered = app_name.map(str::to_lowercase);
        self.rules
            .iter()
            .find(|rule| rule.matches(app_id, lowered.as_deref()))
            .map(|rule| rule.category)
            .unwrap_or(ContextType::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_ignores_case() {
        let classifier = AppClassifier::default();
        assert_eq!(classifier.classify(None, Some("Twitter")), ContextType::Distraction);
        assert_eq!(classifier.classify(None, Some("YOUTUBE Music")), ContextType::Distraction);
        assert!(classifier.is_distraction(Some("com.example.unknown"), Some("Reddit Viewer")));
    }

    #[test]
    fn exact_app_id_matches_without_name() {
        let classifier = AppClassifier::default();
        assert_eq!(
            classifier.classify(Some("com.tinyspeck.slackmacgap"), None),
            ContextType::Communication
        );
        assert_eq!(classifier.classify(Some("com.apple.dt.Xcode"), Some("")), ContextType::Work);
    }

    #[test]
    fn app_id_match_is_case_sensitive() {
        let classifier = AppClassifier::new(&[CategoryRule::new(
            ContextType::Distraction,
            &["com.example.Game"],
            &[],
        )]);
        assert!(classifier.is_distraction(Some("com.example.Game"), None));
        assert!(!classifier.is_distraction(Some("com.example.game"), None));
    }

    #[test]
    fn first_matching_rule_wins() {
        let classifier = AppClassifier::new(&[
            CategoryRule::new(ContextType::Distraction, &[], &["tube"]),
            CategoryRule::new(ContextType::Work, &[], &["youtube studio"]),
        ]);
        assert_eq!(classifier.classify(None, Some("YouTube Studio")), ContextType::Distraction);
    }

    #[test]
    fn unmatched_app_is_unknown() {
        let classifier = AppClassifier::default();
        assert_eq!(classifier.classify(Some("com.example.tool"), Some("Tool")), ContextType::Unknown);
        assert_eq!(classifier.classify(None, None), ContextType::Unknown);
    }
}
