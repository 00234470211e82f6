//! Engine configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RETURNABLE_NUMBER_OF_DAYS: u32 = 30;
pub const DEFAULT_RETURN_EVENT_NAME: &str = "return";
pub const DEFAULT_REFERENCE_PREFIX: &str = "R";
pub const DEFAULT_REFERENCE_ALLOCATION_ATTEMPTS: u32 = 3;

/// Settings of the return lifecycle engine.
///
/// Every field has a default so partial configuration documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnsConfig {
    /// Days after item creation at which an item stops being returnable.
    pub global_returnable_number_of_days: u32,
    /// Item state names from which a return may start.
    pub returnable_state_names: BTreeSet<String>,
    /// Order state machine event requested for returned items.
    pub return_event_name: String,
    /// Fixed part of generated return references.
    pub reference_prefix: String,
    /// Reference allocations tried before a unique-constraint conflict is fatal.
    pub reference_allocation_attempts: u32,
}

impl Default for ReturnsConfig {
    fn default() -> Self {
        Self {
            global_returnable_number_of_days: DEFAULT_RETURNABLE_NUMBER_OF_DAYS,
            returnable_state_names: ["shipped", "delivered"]
                .into_iter()
                .map(String::from)
                .collect(),
            return_event_name: DEFAULT_RETURN_EVENT_NAME.to_string(),
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            reference_allocation_attempts: DEFAULT_REFERENCE_ALLOCATION_ATTEMPTS,
        }
    }
}

impl ReturnsConfig {
    pub fn with_returnable_days(mut self, days: u32) -> Self {
        self.global_returnable_number_of_days = days;
        self
    }

    pub fn with_returnable_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returnable_state_names = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_returnable_state(&self, state_name: &str) -> bool {
        self.returnable_state_names.contains(state_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fall_back_to_defaults() {
        let config: ReturnsConfig =
            serde_json::from_str(r#"{ "global_returnable_number_of_days": 14 }"#).unwrap();
        assert_eq!(config.global_returnable_number_of_days, 14);
        assert!(config.is_returnable_state("shipped"));
        assert_eq!(config.return_event_name, "return");
        assert_eq!(config.reference_allocation_attempts, 3);
    }
}
