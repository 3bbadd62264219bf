//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Document lines are entities: a derived line points back at its source
/// line by identity, whatever happened to the source's values since.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
