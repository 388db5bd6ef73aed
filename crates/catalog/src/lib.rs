//! Item catalog module.
//!
//! Read-only view of the host's inventory: stock items, SKU lookup, and the
//! dropdown search used when adding items to a receipt by hand.

pub mod item;

pub use item::{Inventory, ItemId, ItemStatus, Sku, StockItem};
