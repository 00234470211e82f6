//! Return persistence adapters.

pub mod in_memory;

pub use in_memory::InMemoryReturnStorage;

/// Reasons available when nothing else is configured.
pub const DEFAULT_RETURN_REASONS: [&str; 4] = [
    "return.return_reasons.damaged.name",
    "return.return_reasons.wrong_item.name",
    "return.return_reasons.no_longer_needed.name",
    "return.return_reasons.cannot_remember.name",
];
