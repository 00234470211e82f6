//! Configuration loading.

use std::path::Path;

use anyhow::Context;
use tracing::warn;

use returnflow_returns::ReturnsConfig;

pub const ENV_RETURNABLE_DAYS: &str = "RETURNFLOW_RETURNABLE_DAYS";
pub const ENV_RETURNABLE_STATES: &str = "RETURNFLOW_RETURNABLE_STATES";
pub const ENV_RETURN_EVENT: &str = "RETURNFLOW_RETURN_EVENT";
pub const ENV_REFERENCE_PREFIX: &str = "RETURNFLOW_REFERENCE_PREFIX";

/// Engine configuration from `RETURNFLOW_*` environment variables.
///
/// Unset or unparsable variables fall back to defaults with a warning.
pub fn from_env() -> ReturnsConfig {
    from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`from_env`], reading variables through `lookup`.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ReturnsConfig {
    let mut config = ReturnsConfig::default();

    match lookup(ENV_RETURNABLE_DAYS).map(|raw| raw.trim().parse::<u32>()) {
        Some(Ok(days)) => config.global_returnable_number_of_days = days,
        Some(Err(err)) => warn!(
            variable = ENV_RETURNABLE_DAYS,
            error = %err,
            default = config.global_returnable_number_of_days,
            "invalid returnable days; using default"
        ),
        None => warn!(
            variable = ENV_RETURNABLE_DAYS,
            default = config.global_returnable_number_of_days,
            "returnable days not set; using default"
        ),
    }

    match lookup(ENV_RETURNABLE_STATES) {
        Some(raw) => {
            let states: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if states.is_empty() {
                warn!(variable = ENV_RETURNABLE_STATES, "no returnable states listed; using defaults");
            } else {
                config = config.with_returnable_states(states);
            }
        }
        None => warn!(
            variable = ENV_RETURNABLE_STATES,
            defaults = ?config.returnable_state_names,
            "returnable states not set; using defaults"
        ),
    }

    if let Some(event) = lookup(ENV_RETURN_EVENT).filter(|e| !e.trim().is_empty()) {
        config.return_event_name = event.trim().to_string();
    }
    if let Some(prefix) = lookup(ENV_REFERENCE_PREFIX) {
        config.reference_prefix = prefix.trim().to_string();
    }

    config
}

/// Engine configuration from a JSON document; missing fields take defaults.
pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<ReturnsConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading returns config {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing returns config {}", path.display()))
}
