//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are domain objects that are **immutable** and **compared by value**.
/// They represent concepts where identity doesn't matter - only the values matter.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// Example:
/// - `Currency { code: "USD", decimal_places: 2 }` is a value object
/// - `Line { id: LineId(...), quantity: ... }` is an entity
///
/// ## Usage Pattern
///
/// ```ignore
/// let a = Currency::new(CurrencyCode::new("USD")?, 2);
/// let b = Currency::new(CurrencyCode::new("usd")?, 2);
/// assert_eq!(a, b);  // Equal by value, not identity
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
