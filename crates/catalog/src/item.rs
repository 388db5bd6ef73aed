use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inbound_core::{AggregateId, Entity, ValueObject};

/// Stock item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub AggregateId);

impl ItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Stock-keeping unit.
///
/// SKUs are the join key between inventory, purchase-order lines, and
/// delivery history; they are host-assigned strings, compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Sku {}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Inactive,
}

/// A stock item as known to the host inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: ItemId,
    pub name: String,
    pub sku: Sku,
    /// Host-defined system/vendor grouping (free-form taxonomy).
    pub system: String,
    /// Host-defined category (free-form taxonomy).
    pub category: String,
    pub stock_level: i64,
    pub min_stock: i64,
    pub location: String,
    pub status: ItemStatus,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Synthesize a placeholder for an order line whose SKU has no inventory
    /// match yet. The item becomes real if the receipt books a positive
    /// quantity for it.
    pub fn placeholder(
        name: impl Into<String>,
        sku: Sku,
        location: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ItemId::new(AggregateId::new()),
            name: name.into(),
            sku,
            system: "Sonstiges".to_string(),
            category: "Material".to_string(),
            stock_level: 0,
            min_stock: 0,
            location: location.into(),
            status: ItemStatus::Active,
            updated_at: now,
        }
    }
}

impl Entity for StockItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Read-only snapshot of the host's inventory at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<StockItem>,
}

impl Inventory {
    pub fn new(items: Vec<StockItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[StockItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&StockItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// First item carrying the given SKU, if any.
    pub fn find_by_sku(&self, sku: &Sku) -> Option<&StockItem> {
        self.items.iter().find(|i| &i.sku == sku)
    }

    /// Dropdown search: case-insensitive match on the name, verbatim
    /// substring match on the SKU.
    pub fn search(&self, term: &str) -> Vec<&StockItem> {
        let lowered = term.to_lowercase();
        self.items
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&lowered) || i.sku.as_str().contains(term))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, sku: &str) -> StockItem {
        StockItem {
            id: ItemId::new(AggregateId::new()),
            name: name.to_string(),
            sku: Sku::new(sku),
            system: "HLU".to_string(),
            category: "Material".to_string(),
            stock_level: 12,
            min_stock: 2,
            location: "KEH".to_string(),
            status: ItemStatus::Active,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn search_matches_name_case_insensitively() {
        let inv = Inventory::new(vec![item("Akku 18V", "A-100"), item("Ladekabel", "L-200")]);
        let hits = inv.search("akku");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sku, Sku::new("A-100"));
    }

    #[test]
    fn search_matches_sku_verbatim() {
        let inv = Inventory::new(vec![item("Akku 18V", "A-100"), item("Ladekabel", "L-200")]);
        assert_eq!(inv.search("L-2").len(), 1);
        // SKU matching is case-sensitive, unlike name matching.
        assert!(inv.search("l-2").is_empty());
    }

    #[test]
    fn find_by_sku_returns_first_match() {
        let first = item("Akku 18V", "A-100");
        let inv = Inventory::new(vec![first.clone(), item("Akku 18V v2", "A-100")]);
        assert_eq!(inv.find_by_sku(&Sku::new("A-100")), Some(&first));
    }

    #[test]
    fn placeholder_starts_empty_and_active() {
        let now = Utc::now();
        let p = StockItem::placeholder("Neuteil", Sku::new("N-1"), "Wareneingang", now);
        assert_eq!(p.stock_level, 0);
        assert_eq!(p.min_stock, 0);
        assert_eq!(p.status, ItemStatus::Active);
        assert_eq!(p.system, "Sonstiges");
        assert_eq!(p.category, "Material");
        assert_eq!(p.location, "Wareneingang");
    }

    #[test]
    fn sku_serializes_transparently() {
        let json = serde_json::to_string(&Sku::new("A-100")).unwrap();
        assert_eq!(json, "\"A-100\"");
    }
}
