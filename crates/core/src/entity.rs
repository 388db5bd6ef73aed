//! Entity trait: identity + continuity across state changes.

/// Marker trait for entities.
///
/// An entity is tracked by identity, not by value: a `StockItem` whose stock
/// level changed is still the same item. Compare ids, not field contents,
/// when asking whether two references mean the same thing.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
