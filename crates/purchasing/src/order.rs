use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use inbound_catalog::Sku;
use inbound_core::ValueObject;

/// Human-facing purchase-order number (host-assigned, e.g. "BE-2024-0117").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for OrderNumber {}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the order stocks the warehouse or supplies a customer project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Stock,
    Project,
}

/// One ordered position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: Sku,
    pub name: String,
    pub expected: i64,
    pub received: i64,
}

/// A purchase order, read-only from the receiving flow's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub number: OrderNumber,
    pub supplier: String,
    pub created_on: NaiveDate,
    pub kind: OrderKind,
    pub cancelled: bool,
    pub archived: bool,
    pub force_closed: bool,
    pub lines: Vec<OrderLine>,
}

impl PurchaseOrder {
    pub fn total_expected(&self) -> i64 {
        self.lines.iter().map(|l| l.expected).sum()
    }

    pub fn total_received(&self) -> i64 {
        self.lines.iter().map(|l| l.received).sum()
    }

    pub fn fully_received(&self) -> bool {
        let expected = self.total_expected();
        expected > 0 && self.total_received() >= expected
    }

    /// Still selectable for goods receipt.
    pub fn open(&self) -> bool {
        !self.archived && !self.cancelled && !self.force_closed && !self.fully_received()
    }
}

/// Orders selectable in the order picker, narrowed by a search term matched
/// case-insensitively against order number and supplier.
pub fn open_orders<'a>(orders: &'a [PurchaseOrder], term: &str) -> Vec<&'a PurchaseOrder> {
    let lowered = term.to_lowercase();
    orders
        .iter()
        .filter(|o| o.open())
        .filter(|o| {
            lowered.is_empty()
                || o.number.as_str().to_lowercase().contains(&lowered)
                || o.supplier.to_lowercase().contains(&lowered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(number: &str, supplier: &str) -> PurchaseOrder {
        PurchaseOrder {
            number: OrderNumber::new(number),
            supplier: supplier.to_string(),
            created_on: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            kind: OrderKind::Stock,
            cancelled: false,
            archived: false,
            force_closed: false,
            lines: vec![OrderLine {
                sku: Sku::new("A-100"),
                name: "Akku 18V".to_string(),
                expected: 10,
                received: 0,
            }],
        }
    }

    #[test]
    fn picker_excludes_archived_cancelled_and_force_closed() {
        let mut archived = order("BE-1", "Brandt");
        archived.archived = true;
        let mut cancelled = order("BE-2", "Brandt");
        cancelled.cancelled = true;
        let mut closed = order("BE-3", "Brandt");
        closed.force_closed = true;
        let open = order("BE-4", "Brandt");

        let orders = vec![archived, cancelled, closed, open];
        let hits = open_orders(&orders, "");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].number, OrderNumber::new("BE-4"));
    }

    #[test]
    fn picker_excludes_fully_received_orders() {
        let mut done = order("BE-1", "Brandt");
        done.lines[0].received = 10;
        let mut partial = order("BE-2", "Brandt");
        partial.lines[0].received = 4;

        let orders = vec![done, partial];
        let hits = open_orders(&orders, "");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].number, OrderNumber::new("BE-2"));
    }

    #[test]
    fn order_with_no_expected_quantity_stays_open() {
        let mut empty = order("BE-1", "Brandt");
        empty.lines.clear();
        assert!(empty.open());
    }

    #[test]
    fn picker_matches_number_and_supplier_case_insensitively() {
        let orders = vec![order("BE-1", "Brandt"), order("XX-2", "Dallmann")];
        assert_eq!(open_orders(&orders, "be-").len(), 1);
        assert_eq!(open_orders(&orders, "DALL").len(), 1);
        assert!(open_orders(&orders, "nothing").is_empty());
    }
}
