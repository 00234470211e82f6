//! Order subsystem adapters: item lookups and the order state machine.

pub mod in_memory;

pub use in_memory::InMemoryOrderSubsystem;

/// Message emitted when an item has no transition for the requested event.
pub const TRANSITION_NOT_ALLOWED: &str = "oms.trigger.error.transition_not_allowed";
pub const TRANSITION_PARAM_EVENT: &str = "%event%";

/// `(from, event, to)` transitions every in-memory subsystem starts with.
pub const DEFAULT_RETURN_TRANSITIONS: [(&str, &str, &str); 2] = [
    ("shipped", "return", "waiting for return"),
    ("delivered", "return", "waiting for return"),
];
