//! Per-invocation policy enforcement for agent scripts: budgets, rate
//! limits, content filtering, and an append-only audit trail, composed by
//! [`SafetyManager`].
//!
//! Every checker is synchronous and single-owner; a host running concurrent
//! workers gives each its own manager or serializes access externally.

pub mod audit;
pub mod budget;
pub mod content_filter;
pub mod logger;
pub mod manager;
pub mod rate_limit;

pub use audit::{AuditEvent, AuditLogger};
pub use budget::{BudgetStatus, BudgetTracker};
pub use content_filter::{ContentFilter, ScanOutcome};
pub use logger::init_logger;
pub use manager::{SafetyManager, SafetyStatus};
pub use rate_limit::{RateLimiter, RateStatus};
