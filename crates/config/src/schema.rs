//! Safety configuration schema, typed for serde YAML/JSON deserialization.
//!
//! Constructed once at startup and treated as immutable afterwards. Every
//! ceiling is optional: an omitted budget or rate field means that dimension
//! is never checked.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetyConfig {
    /// Spend ceiling over a rolling 24-hour window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<f64>,

    /// Spend ceiling over a rolling 1-hour window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_budget: Option<f64>,

    /// Token ceiling over the rolling 24-hour window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_hour: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_day: Option<u32>,

    /// Forbidden substrings, checked before topics, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_patterns: Vec<String>,

    /// Forbidden topic regexes (source form), checked in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_topics: Vec<String>,

    /// Match patterns and topics case-sensitively. Default: case-folded.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Master switch: a disabled manager no-ops every check and record call.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub audit_logging: bool,

    /// Audit sink path; one JSON line per event is appended here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_sink: Option<PathBuf>,

    /// Agent identity label for audit tagging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            daily_budget: None,
            hourly_budget: None,
            token_budget: None,
            requests_per_minute: None,
            requests_per_hour: None,
            requests_per_day: None,
            blocked_patterns: Vec::new(),
            blocked_topics: Vec::new(),
            case_sensitive: false,
            enabled: true,
            audit_logging: true,
            audit_sink: None,
            agent_name: None,
        }
    }
}

impl SafetyConfig {
    /// The sink path to use, falling back to the well-known temp location.
    pub fn resolved_audit_sink(&self) -> PathBuf {
        self.audit_sink
            .clone()
            .unwrap_or_else(defaults::default_audit_sink)
    }

    pub fn resolved_agent_name(&self) -> String {
        self.agent_name
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_AGENT_NAME.to_string())
    }

    pub fn has_budget_config(&self) -> bool {
        self.daily_budget.is_some() || self.hourly_budget.is_some() || self.token_budget.is_some()
    }

    pub fn has_rate_config(&self) -> bool {
        self.requests_per_minute.is_some()
            || self.requests_per_hour.is_some()
            || self.requests_per_day.is_some()
    }

    pub fn has_content_config(&self) -> bool {
        !self.blocked_patterns.is_empty() || !self.blocked_topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let config: SafetyConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert!(config.audit_logging);
        assert!(!config.case_sensitive);
        assert!(!config.has_budget_config());
        assert!(!config.has_rate_config());
        assert!(!config.has_content_config());
    }

    #[test]
    fn fields_are_camel_case() {
        let config: SafetyConfig = serde_json::from_str(
            r#"{"dailyBudget": 10.0, "requestsPerMinute": 3, "blockedPatterns": ["password"]}"#,
        )
        .unwrap();
        assert_eq!(config.daily_budget, Some(10.0));
        assert_eq!(config.requests_per_minute, Some(3));
        assert!(config.has_content_config());
    }

    #[test]
    fn yaml_form_parses() {
        let config: SafetyConfig = serde_yaml::from_str(
            "dailyBudget: 5.5\nenabled: false\nblockedTopics:\n  - \"(?i)weapon\"\n",
        )
        .unwrap();
        assert_eq!(config.daily_budget, Some(5.5));
        assert!(!config.enabled);
        assert_eq!(config.blocked_topics.len(), 1);
    }

    #[test]
    fn resolved_fallbacks() {
        let config = SafetyConfig::default();
        assert_eq!(config.resolved_agent_name(), "unknown");
        assert!(config
            .resolved_audit_sink()
            .to_string_lossy()
            .contains("scriptwarden-audit"));
    }
}
