//! Append-only audit trail of safety decisions.
//!
//! Each event is one JSON line appended to the configured sink and mirrored
//! to the `audit` tracing target. Sink failures degrade to a warning; an
//! unwritable audit file never takes the enforcement path down with it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use scriptwarden_core::{BudgetDimension, Direction, RateWindowKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub event_type: String,
    #[serde(flatten)]
    pub details: serde_json::Value,
}

impl AuditEvent {
    fn new(agent_name: &str, event_type: &str, details: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent_name: agent_name.to_string(),
            event_type: event_type.to_string(),
            details,
        }
    }
}

#[derive(Debug)]
pub struct AuditLogger {
    sink: PathBuf,
    agent_name: String,
}

impl AuditLogger {
    pub fn new(sink: impl Into<PathBuf>, agent_name: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            agent_name: agent_name.into(),
        }
    }

    pub fn sink_path(&self) -> &Path {
        &self.sink
    }

    /// Append one event line. Best-effort: write failures are logged and
    /// swallowed.
    pub fn log_event(&self, event_type: &str, details: serde_json::Value) {
        let event = AuditEvent::new(&self.agent_name, event_type, details);
        tracing::info!(
            target: "audit",
            event_type = %event.event_type,
            agent = %event.agent_name,
            "audit event"
        );
        if let Err(e) = self.append(&event) {
            tracing::warn!(
                sink = %self.sink.display(),
                error = %e,
                "failed to write audit event"
            );
        }
    }

    fn append(&self, event: &AuditEvent) -> anyhow::Result<()> {
        if let Some(parent) = self.sink.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.sink)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    pub fn log_blocked_request(&self, kind: &str, reason: &str) {
        self.log_event(
            "blocked_request",
            json!({ "kind": kind, "reason": reason }),
        );
    }

    pub fn log_budget_event(
        &self,
        dimension: BudgetDimension,
        current: f64,
        limit: f64,
        requested: f64,
    ) {
        self.log_event(
            "budget_exceeded",
            json!({
                "dimension": dimension,
                "current": current,
                "limit": limit,
                "requested": requested,
            }),
        );
    }

    pub fn log_rate_limit_event(
        &self,
        window: RateWindowKind,
        current: usize,
        limit: u32,
        retry_after_secs: u64,
    ) {
        self.log_event(
            "rate_limit_exceeded",
            json!({
                "window": window,
                "current": current,
                "limit": limit,
                "retry_after_secs": retry_after_secs,
            }),
        );
    }

    pub fn log_content_filter_event(&self, direction: Direction, rule: &str) {
        self.log_event(
            "content_filter",
            json!({ "direction": direction, "rule": rule }),
        );
    }

    /// Read the most recent `limit` events from the sink, oldest first.
    /// Unparseable lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<AuditEvent> {
        let Ok(contents) = std::fs::read_to_string(&self.sink) else {
            return Vec::new();
        };
        let mut events: Vec<AuditEvent> = contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        if events.len() > limit {
            events.drain(..events.len() - limit);
        }
        events
    }
}
