//! Deep config checks with field-path error messages.

use regex::Regex;
use thiserror::Error;

use crate::schema::SafetyConfig;

/// A config validation finding with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of findings from one validation pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &SafetyConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_budgets(config, &mut report);
    validate_rates(config, &mut report);
    validate_content(config, &mut report);
    report
}

fn validate_budgets(config: &SafetyConfig, report: &mut ValidationReport) {
    for (path, value) in [
        ("dailyBudget", config.daily_budget),
        ("hourlyBudget", config.hourly_budget),
    ] {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                report.error(path, format!("budget must be a non-negative number, got {value}"));
            }
        }
    }
    if let (Some(daily), Some(hourly)) = (config.daily_budget, config.hourly_budget) {
        if hourly > daily {
            report.warn(
                "hourlyBudget",
                "hourly budget exceeds daily budget; the daily ceiling will bind first",
            );
        }
    }
    if config.token_budget == Some(0) {
        report.warn("tokenBudget", "a zero token budget blocks every request");
    }
}

fn validate_rates(config: &SafetyConfig, report: &mut ValidationReport) {
    for (path, value) in [
        ("requestsPerMinute", config.requests_per_minute),
        ("requestsPerHour", config.requests_per_hour),
        ("requestsPerDay", config.requests_per_day),
    ] {
        if value == Some(0) {
            report.warn(path, "a zero rate ceiling permits no requests at all");
        }
    }
}

fn validate_content(config: &SafetyConfig, report: &mut ValidationReport) {
    for (i, pattern) in config.blocked_patterns.iter().enumerate() {
        if pattern.is_empty() {
            report.error(
                format!("blockedPatterns[{i}]"),
                "empty pattern matches everything",
            );
        }
    }
    for (i, topic) in config.blocked_topics.iter().enumerate() {
        if let Err(err) = Regex::new(topic) {
            report.error(format!("blockedTopics[{i}]"), format!("invalid regex: {err}"));
        }
    }
}
