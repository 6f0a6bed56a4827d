//! Spend and token budget tracking over rolling windows.
//!
//! Windows are rolling, not calendar-aligned: each resets to zero exactly
//! when its duration has elapsed since its own last reset. Resets always
//! precede the check they affect.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use scriptwarden_core::{BudgetDimension, SafetyError};

#[derive(Debug, Clone)]
struct BudgetState {
    daily_spend: f64,
    hourly_spend: f64,
    daily_tokens: u64,
    hourly_tokens: u64,
    daily_window_start: DateTime<Utc>,
    hourly_window_start: DateTime<Utc>,
}

/// Tracks spend/token consumption for one agent. Single-owner: counters are
/// not internally synchronized.
#[derive(Debug)]
pub struct BudgetTracker {
    daily_budget: Option<f64>,
    hourly_budget: Option<f64>,
    token_budget: Option<u64>,
    state: BudgetState,
}

/// Status of one checked dimension.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DimensionStatus {
    pub current: f64,
    pub limit: f64,
    pub remaining: f64,
    pub percent_used: f64,
}

impl DimensionStatus {
    fn new(current: f64, limit: f64) -> Self {
        Self {
            current,
            limit,
            remaining: (limit - current).max(0.0),
            percent_used: if limit > 0.0 { (current / limit) * 100.0 } else { 100.0 },
        }
    }
}

/// Per-dimension status report; `None` means no ceiling is configured.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BudgetStatus {
    pub daily_spend: Option<DimensionStatus>,
    pub hourly_spend: Option<DimensionStatus>,
    pub daily_tokens: Option<DimensionStatus>,
    /// Tokens consumed in the current hourly window. Informational only; no
    /// ceiling applies to this figure.
    pub hourly_tokens: u64,
}

impl BudgetTracker {
    pub fn new(
        daily_budget: Option<f64>,
        hourly_budget: Option<f64>,
        token_budget: Option<u64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            daily_budget,
            hourly_budget,
            token_budget,
            state: BudgetState {
                daily_spend: 0.0,
                hourly_spend: 0.0,
                daily_tokens: 0,
                hourly_tokens: 0,
                daily_window_start: now,
                hourly_window_start: now,
            },
        }
    }

    fn reset_expired_windows(&mut self, now: DateTime<Utc>) {
        if now - self.state.daily_window_start >= Duration::hours(24) {
            self.state.daily_spend = 0.0;
            self.state.daily_tokens = 0;
            self.state.daily_window_start = now;
        }
        if now - self.state.hourly_window_start >= Duration::hours(1) {
            self.state.hourly_spend = 0.0;
            self.state.hourly_tokens = 0;
            self.state.hourly_window_start = now;
        }
    }

    /// Fail if accepting the estimate would push any configured ceiling
    /// past its limit. Dimensions are independent; the first one found over
    /// budget is the one reported. Unconfigured dimensions are never
    /// checked.
    pub fn check_budget(
        &mut self,
        estimated_cost: f64,
        estimated_tokens: u64,
    ) -> Result<(), SafetyError> {
        self.reset_expired_windows(Utc::now());

        if let Some(limit) = self.daily_budget {
            if self.state.daily_spend + estimated_cost > limit {
                return Err(SafetyError::BudgetExceeded {
                    dimension: BudgetDimension::DailySpend,
                    current: self.state.daily_spend,
                    limit,
                    requested: estimated_cost,
                });
            }
        }
        if let Some(limit) = self.hourly_budget {
            if self.state.hourly_spend + estimated_cost > limit {
                return Err(SafetyError::BudgetExceeded {
                    dimension: BudgetDimension::HourlySpend,
                    current: self.state.hourly_spend,
                    limit,
                    requested: estimated_cost,
                });
            }
        }
        if let Some(limit) = self.token_budget {
            if self.state.daily_tokens + estimated_tokens > limit {
                return Err(SafetyError::BudgetExceeded {
                    dimension: BudgetDimension::DailyTokens,
                    current: self.state.daily_tokens as f64,
                    limit: limit as f64,
                    requested: estimated_tokens as f64,
                });
            }
        }
        Ok(())
    }

    /// Add actual consumption to every counter. Never re-checks limits:
    /// recording spend that was already incurred must not fail.
    pub fn record_spending(&mut self, cost: f64, tokens: u64) {
        self.reset_expired_windows(Utc::now());
        self.state.daily_spend += cost;
        self.state.hourly_spend += cost;
        self.state.daily_tokens += tokens;
        self.state.hourly_tokens += tokens;
    }

    pub fn status(&mut self) -> BudgetStatus {
        self.reset_expired_windows(Utc::now());
        BudgetStatus {
            daily_spend: self
                .daily_budget
                .map(|limit| DimensionStatus::new(self.state.daily_spend, limit)),
            hourly_spend: self
                .hourly_budget
                .map(|limit| DimensionStatus::new(self.state.hourly_spend, limit)),
            daily_tokens: self
                .token_budget
                .map(|limit| DimensionStatus::new(self.state.daily_tokens as f64, limit as f64)),
            hourly_tokens: self.state.hourly_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_within_budget_passes() {
        let mut tracker = BudgetTracker::new(Some(10.0), None, None);
        assert!(tracker.check_budget(9.99, 0).is_ok());
    }

    #[test]
    fn overspend_reports_current_limit_and_requested() {
        let mut tracker = BudgetTracker::new(Some(10.0), None, None);
        tracker.record_spending(6.0, 0);
        tracker.record_spending(6.0, 0);
        let err = tracker.check_budget(0.01, 0).unwrap_err();
        match err {
            SafetyError::BudgetExceeded {
                dimension,
                current,
                limit,
                requested,
            } => {
                assert_eq!(dimension, BudgetDimension::DailySpend);
                assert_eq!(current, 12.0);
                assert_eq!(limit, 10.0);
                assert_eq!(requested, 0.01);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn recording_never_fails_even_past_the_limit() {
        let mut tracker = BudgetTracker::new(Some(1.0), None, None);
        tracker.record_spending(5.0, 100); // already incurred
        assert_eq!(tracker.state.daily_spend, 5.0);
    }

    #[test]
    fn daily_window_resets_after_24_hours() {
        let mut tracker = BudgetTracker::new(Some(10.0), None, None);
        tracker.record_spending(9.0, 0);
        tracker.state.daily_window_start = Utc::now() - Duration::hours(25);
        // Reset precedes the check: the old spend is discarded first.
        assert!(tracker.check_budget(9.0, 0).is_ok());
        assert_eq!(tracker.state.daily_spend, 0.0);
    }

    #[test]
    fn hourly_window_resets_independently_of_daily() {
        let mut tracker = BudgetTracker::new(Some(100.0), Some(10.0), None);
        tracker.record_spending(9.0, 0);
        tracker.state.hourly_window_start = Utc::now() - Duration::minutes(61);
        assert!(tracker.check_budget(9.0, 0).is_ok());
        // Daily counter survives the hourly reset.
        assert_eq!(tracker.state.daily_spend, 9.0);
        assert_eq!(tracker.state.hourly_spend, 0.0);
    }

    #[test]
    fn hourly_ceiling_is_checked_after_daily() {
        let mut tracker = BudgetTracker::new(Some(100.0), Some(5.0), None);
        tracker.record_spending(4.0, 0);
        let err = tracker.check_budget(2.0, 0).unwrap_err();
        assert!(matches!(
            err,
            SafetyError::BudgetExceeded {
                dimension: BudgetDimension::HourlySpend,
                ..
            }
        ));
    }

    #[test]
    fn token_ceiling_applies_to_the_daily_window() {
        let mut tracker = BudgetTracker::new(None, None, Some(1_000));
        tracker.record_spending(0.0, 900);
        assert!(tracker.check_budget(0.0, 100).is_ok());
        let err = tracker.check_budget(0.0, 101).unwrap_err();
        assert!(matches!(
            err,
            SafetyError::BudgetExceeded {
                dimension: BudgetDimension::DailyTokens,
                ..
            }
        ));
    }

    #[test]
    fn unconfigured_dimensions_are_never_checked() {
        let mut tracker = BudgetTracker::new(None, None, None);
        tracker.record_spending(1_000_000.0, u64::MAX / 2);
        assert!(tracker.check_budget(1_000_000.0, 1).is_ok());
    }

    #[test]
    fn status_reports_remaining_and_percentage() {
        let mut tracker = BudgetTracker::new(Some(10.0), None, Some(100));
        tracker.record_spending(2.5, 40);
        let status = tracker.status();
        let daily = status.daily_spend.unwrap();
        assert_eq!(daily.current, 2.5);
        assert_eq!(daily.remaining, 7.5);
        assert_eq!(daily.percent_used, 25.0);
        assert!(status.hourly_spend.is_none());
        assert_eq!(status.daily_tokens.unwrap().current, 40.0);
        assert_eq!(status.hourly_tokens, 40);
    }
}
