use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::violation::{summarize, Violation};

/// Top-level error type for the scriptwarden safety core.
///
/// Every variant carries the concrete figures or identifiers involved, so the
/// message alone is enough to diagnose a rejection.
#[derive(Debug, Error)]
pub enum SafetyError {
    /// Static validation failed. Aggregates every violation found in one pass.
    #[error("script `{label}` rejected by static validation:\n{}", summarize(.violations))]
    ScriptRejected {
        label: String,
        violations: Vec<Violation>,
    },

    /// A running script attempted an operation its capability context does
    /// not expose. May follow partial side effects.
    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    /// A script runtime fault that is not a policy violation (type error,
    /// unknown variable, bad arity).
    #[error("script execution failed: {0}")]
    ExecutionFailed(String),

    #[error("{dimension} budget exceeded: current {current}, limit {limit}, requested {requested}")]
    BudgetExceeded {
        dimension: BudgetDimension,
        current: f64,
        limit: f64,
        requested: f64,
    },

    #[error("{window} rate limit exceeded: {current}/{limit} requests; retry in {retry_after_secs}s")]
    RateLimitExceeded {
        window: RateWindowKind,
        current: usize,
        limit: u32,
        retry_after_secs: u64,
    },

    #[error("content blocked ({direction}): matched {rule}")]
    ContentBlocked { direction: Direction, rule: String },

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl SafetyError {
    /// Short tag identifying the error kind, used for audit-event tagging.
    pub fn kind(&self) -> &'static str {
        match self {
            SafetyError::ScriptRejected { .. } => "script_rejected",
            SafetyError::CapabilityDenied(_) => "capability_denied",
            SafetyError::ExecutionFailed(_) => "execution_failed",
            SafetyError::BudgetExceeded { .. } => "budget_exceeded",
            SafetyError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            SafetyError::ContentBlocked { .. } => "content_filter",
            SafetyError::ConfigError(_) => "config_error",
        }
    }
}

/// Budget dimensions checked by the tracker, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetDimension {
    DailySpend,
    HourlySpend,
    DailyTokens,
}

impl fmt::Display for BudgetDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BudgetDimension::DailySpend => "daily spend",
            BudgetDimension::HourlySpend => "hourly spend",
            BudgetDimension::DailyTokens => "daily token",
        };
        f.write_str(name)
    }
}

/// Sliding rate-limit windows, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateWindowKind {
    Minute,
    Hour,
    Day,
}

impl RateWindowKind {
    /// Window length in seconds.
    pub fn length_secs(&self) -> u64 {
        match self {
            RateWindowKind::Minute => 60,
            RateWindowKind::Hour => 3_600,
            RateWindowKind::Day => 86_400,
        }
    }
}

impl fmt::Display for RateWindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RateWindowKind::Minute => "per-minute",
            RateWindowKind::Hour => "per-hour",
            RateWindowKind::Day => "per-day",
        };
        f.write_str(name)
    }
}

/// Which side of a model exchange a content check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Input => "input",
            Direction::Output => "output",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::ViolationKind;

    #[test]
    fn budget_message_carries_figures() {
        let err = SafetyError::BudgetExceeded {
            dimension: BudgetDimension::DailySpend,
            current: 12.0,
            limit: 10.0,
            requested: 0.01,
        };
        let msg = err.to_string();
        assert!(msg.contains("daily spend"));
        assert!(msg.contains("12"));
        assert!(msg.contains("10"));
        assert_eq!(err.kind(), "budget_exceeded");
    }

    #[test]
    fn rejected_script_lists_every_violation() {
        let err = SafetyError::ScriptRejected {
            label: "agent/task.ws".to_string(),
            violations: vec![
                Violation::new(ViolationKind::DangerousMethod, Some(1), "call to `exec`"),
                Violation::new(ViolationKind::BacktickExecution, Some(3), "shell-escape literal"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("agent/task.ws"));
        assert!(msg.contains("dangerous_method"));
        assert!(msg.contains("backtick_execution"));
        assert!(msg.contains("line 3"));
    }
}
