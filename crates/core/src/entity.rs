//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier, if one has been assigned yet.
    ///
    /// Entities persisted by a storage layer only get their identity on insert.
    fn id(&self) -> Option<&Self::Id>;
}
