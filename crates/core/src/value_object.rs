//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity: two instances with the same attributes are
/// the same value. `Money`, totals and localized messages are value objects;
/// returns and order items are entities.
///
/// ```ignore
/// let a = Money::from_minor(1000);
/// let b = Money::from_minor(1000);
/// assert_eq!(a, b);
/// ```
///
/// "Modifying" a value object means building a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
