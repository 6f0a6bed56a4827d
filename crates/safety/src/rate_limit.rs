//! Request rate limiting over sliding minute/hour/day windows.
//!
//! Each window is an ordered timestamp list; stale entries are discarded
//! before every decision. The check happens strictly before the record, so
//! a ceiling of N permits at most N requests in the trailing window.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use scriptwarden_core::{RateWindowKind, SafetyError};

/// Tracks request timestamps for one agent. Single-owner: windows are not
/// internally synchronized.
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: Option<u32>,
    per_hour: Option<u32>,
    per_day: Option<u32>,
    minute: VecDeque<DateTime<Utc>>,
    hour: VecDeque<DateTime<Utc>>,
    day: VecDeque<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WindowStatus {
    pub current: usize,
    pub limit: u32,
    pub remaining: u32,
}

/// Per-window status; `None` means no ceiling is configured.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RateStatus {
    pub per_minute: Option<WindowStatus>,
    pub per_hour: Option<WindowStatus>,
    pub per_day: Option<WindowStatus>,
}

fn window_length(kind: RateWindowKind) -> Duration {
    Duration::seconds(kind.length_secs() as i64)
}

fn prune(window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, length: Duration) {
    while window.front().is_some_and(|&t| now - t >= length) {
        window.pop_front();
    }
}

impl RateLimiter {
    pub fn new(per_minute: Option<u32>, per_hour: Option<u32>, per_day: Option<u32>) -> Self {
        Self {
            per_minute,
            per_hour,
            per_day,
            minute: VecDeque::new(),
            hour: VecDeque::new(),
            day: VecDeque::new(),
        }
    }

    /// Fail if any configured window is already at its ceiling. Retry-after
    /// is the time until the oldest retained timestamp ages out.
    pub fn check_rate_limit(&mut self) -> Result<(), SafetyError> {
        let now = Utc::now();
        for (kind, limit, window) in [
            (RateWindowKind::Minute, self.per_minute, &mut self.minute),
            (RateWindowKind::Hour, self.per_hour, &mut self.hour),
            (RateWindowKind::Day, self.per_day, &mut self.day),
        ] {
            let length = window_length(kind);
            prune(window, now, length);
            let Some(limit) = limit else { continue };
            if window.len() >= limit as usize {
                let oldest = window.front().copied().unwrap_or(now);
                let retry_after = length - (now - oldest);
                return Err(SafetyError::RateLimitExceeded {
                    window: kind,
                    current: window.len(),
                    limit,
                    retry_after_secs: retry_after.num_seconds().max(0) as u64,
                });
            }
        }
        Ok(())
    }

    /// Append the current timestamp to all three tracked windows after the
    /// same staleness cleanup the check performs.
    pub fn record_request(&mut self) {
        let now = Utc::now();
        for (kind, window) in [
            (RateWindowKind::Minute, &mut self.minute),
            (RateWindowKind::Hour, &mut self.hour),
            (RateWindowKind::Day, &mut self.day),
        ] {
            prune(window, now, window_length(kind));
            window.push_back(now);
        }
    }

    pub fn status(&mut self) -> RateStatus {
        let now = Utc::now();
        let entry = |kind: RateWindowKind,
                     limit: Option<u32>,
                     window: &mut VecDeque<DateTime<Utc>>|
         -> Option<WindowStatus> {
            prune(window, now, window_length(kind));
            limit.map(|limit| WindowStatus {
                current: window.len(),
                limit,
                remaining: limit.saturating_sub(window.len() as u32),
            })
        };
        RateStatus {
            per_minute: entry(RateWindowKind::Minute, self.per_minute, &mut self.minute),
            per_hour: entry(RateWindowKind::Hour, self.per_hour, &mut self.hour),
            per_day: entry(RateWindowKind::Day, self.per_day, &mut self.day),
        }
    }
}
