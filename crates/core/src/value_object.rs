//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two instances
/// with the same attributes are the same value. `Sku` and `OrderNumber` are
/// value objects; a `StockItem` (which has an id) is an entity.
///
/// To "modify" a value object, build a new one. The trait bounds keep value
/// objects cheap to copy, comparable, and debuggable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
