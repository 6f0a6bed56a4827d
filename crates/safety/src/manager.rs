//! Coordinates the individual safety checkers behind one request lifecycle:
//! `check_request` before a model call, `check_response` on its output, and
//! `record_request` after actuals are known.

use serde::Serialize;
use serde_json::json;

use scriptwarden_config::SafetyConfig;
use scriptwarden_core::{Direction, SafetyError};

use crate::audit::AuditLogger;
use crate::budget::{BudgetStatus, BudgetTracker};
use crate::content_filter::ContentFilter;
use crate::rate_limit::{RateLimiter, RateStatus};

/// Composite enforcement point. Sub-checkers exist only for the dimensions
/// the configuration actually sets; everything else is a no-op.
#[derive(Debug)]
pub struct SafetyManager {
    enabled: bool,
    budget: Option<BudgetTracker>,
    rate: Option<RateLimiter>,
    content: Option<ContentFilter>,
    audit: Option<AuditLogger>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetyStatus {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateStatus>,
    pub content_rules: usize,
}

impl SafetyManager {
    pub fn from_config(config: &SafetyConfig) -> Result<Self, SafetyError> {
        let budget = config.has_budget_config().then(|| {
            BudgetTracker::new(
                config.daily_budget,
                config.hourly_budget,
                config.token_budget,
            )
        });
        let rate = config.has_rate_config().then(|| {
            RateLimiter::new(
                config.requests_per_minute,
                config.requests_per_hour,
                config.requests_per_day,
            )
        });
        let content = if config.has_content_config() {
            Some(ContentFilter::new(
                &config.blocked_patterns,
                &config.blocked_topics,
                config.case_sensitive,
            )?)
        } else {
            None
        };
        let audit = config.audit_logging.then(|| {
            AuditLogger::new(config.resolved_audit_sink(), config.resolved_agent_name())
        });

        tracing::info!(
            enabled = config.enabled,
            budget = budget.is_some(),
            rate = rate.is_some(),
            content = content.is_some(),
            "safety manager configured"
        );

        Ok(Self {
            enabled: config.enabled,
            budget,
            rate,
            content,
            audit,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn audit_logger(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    /// Gate an outbound request. Checks run in order: content filter on the
    /// message, then budget against the estimates, then rate limit. The
    /// first failure is audited (one event) and returned unchanged.
    pub fn check_request(
        &mut self,
        message: &str,
        estimated_cost: f64,
        estimated_tokens: u64,
    ) -> Result<(), SafetyError> {
        if !self.enabled {
            return Ok(());
        }
        let result = self.run_request_checks(message, estimated_cost, estimated_tokens);
        if let Err(ref err) = result {
            tracing::warn!(kind = err.kind(), error = %err, "request blocked");
            self.audit_failure(err);
        }
        result
    }

    fn run_request_checks(
        &mut self,
        message: &str,
        estimated_cost: f64,
        estimated_tokens: u64,
    ) -> Result<(), SafetyError> {
        if let Some(filter) = &self.content {
            filter.check_content(message, Direction::Input)?;
        }
        if let Some(budget) = &mut self.budget {
            budget.check_budget(estimated_cost, estimated_tokens)?;
        }
        if let Some(rate) = &mut self.rate {
            rate.check_rate_limit()?;
        }
        Ok(())
    }

    fn audit_failure(&self, err: &SafetyError) {
        let Some(audit) = &self.audit else { return };
        match err {
            SafetyError::BudgetExceeded {
                dimension,
                current,
                limit,
                requested,
            } => audit.log_budget_event(*dimension, *current, *limit, *requested),
            SafetyError::RateLimitExceeded {
                window,
                current,
                limit,
                retry_after_secs,
            } => audit.log_rate_limit_event(*window, *current, *limit, *retry_after_secs),
            other => audit.log_blocked_request(other.kind(), &other.to_string()),
        }
    }

    /// Gate a model response through the content filter.
    pub fn check_response(&self, response: &str) -> Result<(), SafetyError> {
        if !self.enabled {
            return Ok(());
        }
        let Some(filter) = &self.content else {
            return Ok(());
        };
        match filter.check_content(response, Direction::Output) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "response blocked");
                if let Some(audit) = &self.audit {
                    if let SafetyError::ContentBlocked { direction, rule } = &err {
                        audit.log_content_filter_event(*direction, rule);
                    }
                }
                Err(err)
            }
        }
    }

    /// Record the actual cost and token figures of a completed request.
    pub fn record_request(&mut self, cost: f64, tokens: u64) {
        if !self.enabled {
            return;
        }
        if let Some(budget) = &mut self.budget {
            budget.record_spending(cost, tokens);
        }
        if let Some(rate) = &mut self.rate {
            rate.record_request();
        }
        if let Some(audit) = &self.audit {
            audit.log_event(
                "request_completed",
                json!({ "cost": cost, "tokens": tokens }),
            );
        }
    }

    pub fn status(&mut self) -> SafetyStatus {
        SafetyStatus {
            enabled: self.enabled,
            budget: self.budget.as_mut().map(BudgetTracker::status),
            rate: self.rate.as_mut().map(RateLimiter::status),
            content_rules: self.content.as_ref().map_or(0, ContentFilter::rule_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SafetyConfig {
        SafetyConfig {
            audit_logging: false,
            ..SafetyConfig::default()
        }
    }

    #[test]
    fn unconfigured_manager_allows_everything() {
        let mut manager = SafetyManager::from_config(&base_config()).unwrap();
        assert!(manager.check_request("anything", 1_000.0, 1_000_000).is_ok());
        assert!(manager.check_response("anything").is_ok());
        manager.record_request(1_000.0, 1_000_000);
        let status = manager.status();
        assert!(status.enabled);
        assert!(status.budget.is_none());
        assert!(status.rate.is_none());
        assert_eq!(status.content_rules, 0);
    }

    #[test]
    fn disabled_manager_no_ops_every_check() {
        let config = SafetyConfig {
            enabled: false,
            daily_budget: Some(0.01),
            blocked_patterns: vec!["blocked".to_string()],
            ..base_config()
        };
        let mut manager = SafetyManager::from_config(&config).unwrap();
        assert!(manager.check_request("blocked", 100.0, 0).is_ok());
        assert!(manager.check_response("blocked").is_ok());
        manager.record_request(100.0, 0);
    }

    #[test]
    fn content_is_checked_before_budget() {
        let config = SafetyConfig {
            daily_budget: Some(1.0),
            blocked_patterns: vec!["password".to_string()],
            ..base_config()
        };
        let mut manager = SafetyManager::from_config(&config).unwrap();
        // both violated; the content filter runs first
        let err = manager.check_request("my password", 5.0, 0).unwrap_err();
        assert_eq!(err.kind(), "content_filter");
    }

    #[test]
    fn recorded_spending_feeds_later_checks() {
        let config = SafetyConfig {
            daily_budget: Some(10.0),
            ..base_config()
        };
        let mut manager = SafetyManager::from_config(&config).unwrap();
        assert!(manager.check_request("hi", 6.0, 0).is_ok());
        manager.record_request(6.0, 100);
        let err = manager.check_request("hi", 6.0, 0).unwrap_err();
        assert_eq!(err.kind(), "budget_exceeded");
        let status = manager.status();
        let daily = status.budget.unwrap().daily_spend.unwrap();
        assert_eq!(daily.current, 6.0);
        assert_eq!(daily.limit, 10.0);
    }

    #[test]
    fn rate_ceiling_applies_across_the_lifecycle() {
        let config = SafetyConfig {
            requests_per_minute: Some(2),
            ..base_config()
        };
        let mut manager = SafetyManager::from_config(&config).unwrap();
        for _ in 0..2 {
            assert!(manager.check_request("hi", 0.0, 0).is_ok());
            manager.record_request(0.0, 0);
        }
        let err = manager.check_request("hi", 0.0, 0).unwrap_err();
        assert_eq!(err.kind(), "rate_limit_exceeded");
    }

    #[test]
    fn blocked_request_writes_exactly_one_audit_event() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("audit.jsonl");
        let config = SafetyConfig {
            daily_budget: Some(1.0),
            blocked_patterns: vec!["password".to_string()],
            audit_sink: Some(sink.clone()),
            agent_name: Some("tester".to_string()),
            ..SafetyConfig::default()
        };
        let mut manager = SafetyManager::from_config(&config).unwrap();
        let err = manager.check_request("my password", 5.0, 0).unwrap_err();
        assert_eq!(err.kind(), "content_filter");

        let contents = std::fs::read_to_string(&sink).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(event["event_type"], "blocked_request");
        assert_eq!(event["kind"], "content_filter");
        assert_eq!(event["agent_name"], "tester");
    }

    #[test]
    fn budget_failure_is_audited_with_figures() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("audit.jsonl");
        let config = SafetyConfig {
            daily_budget: Some(1.0),
            audit_sink: Some(sink.clone()),
            ..SafetyConfig::default()
        };
        let mut manager = SafetyManager::from_config(&config).unwrap();
        manager.check_request("hi", 5.0, 0).unwrap_err();

        let contents = std::fs::read_to_string(&sink).unwrap();
        let event: serde_json::Value =
            serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(event["event_type"], "budget_exceeded");
        assert_eq!(event["dimension"], "daily_spend");
        assert_eq!(event["requested"], 5.0);
    }

    #[test]
    fn blocked_response_is_audited_as_output() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("audit.jsonl");
        let config = SafetyConfig {
            blocked_patterns: vec!["secret".to_string()],
            audit_sink: Some(sink.clone()),
            ..SafetyConfig::default()
        };
        let mut manager = SafetyManager::from_config(&config).unwrap();
        assert!(manager.check_request("fine", 0.0, 0).is_ok());
        let err = manager.check_response("a secret leaked").unwrap_err();
        assert_eq!(err.kind(), "content_filter");

        let contents = std::fs::read_to_string(&sink).unwrap();
        let event: serde_json::Value =
            serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(event["event_type"], "content_filter");
        assert_eq!(event["direction"], "output");
    }

    #[test]
    fn bad_topic_regex_fails_construction() {
        let config = SafetyConfig {
            blocked_topics: vec!["(unclosed".to_string()],
            ..base_config()
        };
        let err = SafetyManager::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), "config_error");
    }
}
