//! Config file loading and environment overrides.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::defaults::apply_defaults;
use crate::schema::SafetyConfig;

/// Environment variable overriding the configured agent identity.
pub const AGENT_ENV_VAR: &str = "SCRIPTWARDEN_AGENT";

/// Load and parse a config from disk, by extension: `.json` is JSON,
/// anything else is YAML. A missing file is a normal first run and yields
/// defaults. Identity defaults and env overrides are applied before return.
pub fn load_config(path: &Path) -> Result<SafetyConfig> {
    let config = if path.exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let parsed: SafetyConfig = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config JSON at: {}", path.display()))?
        } else {
            serde_yaml::from_str(&raw)
                .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?
        };
        info!(path = %path.display(), "Loaded safety config");
        parsed
    } else {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        SafetyConfig::default()
    };
    Ok(apply_env_overrides(apply_defaults(config)))
}

/// Apply process-environment overrides on top of a parsed config.
pub fn apply_env_overrides(mut config: SafetyConfig) -> SafetyConfig {
    if let Ok(name) = std::env::var(AGENT_ENV_VAR) {
        if !name.trim().is_empty() {
            config.agent_name = Some(name);
        }
    }
    config
}
