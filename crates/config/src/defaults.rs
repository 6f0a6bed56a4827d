//! Named defaults applied to freshly loaded configs.

use std::path::PathBuf;

use crate::schema::SafetyConfig;

/// Agent identity used for audit tagging when none is configured.
pub const DEFAULT_AGENT_NAME: &str = "unknown";

/// Audit sink file name within the system temp directory.
pub const DEFAULT_AUDIT_SINK_NAME: &str = "scriptwarden-audit.jsonl";

/// Well-known temp location used when no sink is configured.
pub fn default_audit_sink() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_AUDIT_SINK_NAME)
}

/// Fill in the optional identity fields so downstream components never have
/// to re-derive fallbacks.
pub fn apply_defaults(mut config: SafetyConfig) -> SafetyConfig {
    if config.agent_name.is_none() {
        config.agent_name = Some(DEFAULT_AGENT_NAME.to_string());
    }
    if config.audit_sink.is_none() {
        config.audit_sink = Some(default_audit_sink());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_identity_fields_only() {
        let config = apply_defaults(SafetyConfig::default());
        assert_eq!(config.agent_name.as_deref(), Some(DEFAULT_AGENT_NAME));
        assert!(config.audit_sink.is_some());
        assert!(config.daily_budget.is_none()); // ceilings stay unset
    }

    #[test]
    fn defaults_never_override_explicit_values() {
        let config = apply_defaults(SafetyConfig {
            agent_name: Some("researcher".to_string()),
            ..SafetyConfig::default()
        });
        assert_eq!(config.agent_name.as_deref(), Some("researcher"));
    }
}
