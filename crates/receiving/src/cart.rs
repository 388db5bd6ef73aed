use serde::{Deserialize, Serialize};

use inbound_catalog::StockItem;

/// Upper bound of the quantity stepper; inputs are clamped into `[0, QTY_MAX]`.
pub const QTY_MAX: i64 = 999;

pub(crate) fn clamp_quantity(quantity: i64) -> i64 {
    quantity.clamp(0, QTY_MAX)
}

/// Why goods on a line were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionReason {
    Damaged,
    Wrong,
    Overdelivery,
    Other,
}

impl RejectionReason {
    /// Human-readable label used in ticket texts.
    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::Damaged => "damaged",
            RejectionReason::Wrong => "wrong delivery",
            RejectionReason::Overdelivery => "overdelivery",
            RejectionReason::Other => "other",
        }
    }
}

/// One item position of the in-progress receipt.
///
/// Invariant: `accepted == received - rejected` after every quantity change;
/// all quantity writes go through [`CartLine::set_quantities`] so there is a
/// single enforcement point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: StockItem,
    pub received: i64,
    pub rejected: i64,
    /// Derived: received minus rejected. Negative when a line rejects more
    /// than it received today (a net stock removal).
    pub accepted: i64,
    pub location: String,
    pub rejection_reason: Option<RejectionReason>,
    pub rejection_notes: String,
    pub return_carrier: String,
    pub return_tracking: String,
    /// Expected quantity on the linked order line; `None` for lines added by
    /// hand while no order is linked.
    pub ordered: Option<i64>,
    /// Accepted quantity from earlier deliveries against the same order line.
    pub previously_received: Option<i64>,
    pub is_manual_addition: bool,
    pub issue_notes: String,
    pub issue_panel_open: bool,
}

impl CartLine {
    /// Seed a line from a purchase-order line.
    pub fn from_order_line(
        item: StockItem,
        expected: i64,
        history: i64,
        received: i64,
        location: impl Into<String>,
    ) -> Self {
        Self {
            item,
            received,
            rejected: 0,
            accepted: received,
            location: location.into(),
            rejection_reason: None,
            rejection_notes: String::new(),
            return_carrier: String::new(),
            return_tracking: String::new(),
            ordered: Some(expected),
            previously_received: Some(history),
            is_manual_addition: false,
            issue_notes: String::new(),
            issue_panel_open: false,
        }
    }

    /// Seed a line added through the item search.
    ///
    /// While an order is linked, hand-added lines are flagged as manual
    /// additions and count against an ordered quantity of zero.
    pub fn manual(item: StockItem, location: impl Into<String>, order_linked: bool) -> Self {
        Self {
            item,
            received: 1,
            rejected: 0,
            accepted: 1,
            location: location.into(),
            rejection_reason: None,
            rejection_notes: String::new(),
            return_carrier: String::new(),
            return_tracking: String::new(),
            ordered: if order_linked { Some(0) } else { None },
            previously_received: Some(0),
            is_manual_addition: order_linked,
            issue_notes: String::new(),
            issue_panel_open: false,
        }
    }

    pub(crate) fn set_quantities(&mut self, received: i64, rejected: i64) {
        self.received = received;
        self.rejected = rejected;
        self.accepted = received - rejected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inbound_catalog::Sku;

    fn line() -> CartLine {
        let item = StockItem::placeholder("Akku 18V", Sku::new("A-100"), "KEH", Utc::now());
        CartLine::from_order_line(item, 10, 4, 6, "KEH")
    }

    #[test]
    fn accepted_tracks_received_minus_rejected() {
        let mut l = line();
        assert_eq!(l.accepted, 6);

        l.set_quantities(6, 2);
        assert_eq!(l.accepted, 4);

        l.set_quantities(3, 5);
        assert_eq!(l.accepted, -2);
    }

    #[test]
    fn manual_line_counts_against_zero_order_only_when_linked() {
        let item = StockItem::placeholder("Kabel", Sku::new("K-1"), "KEH", Utc::now());
        let linked = CartLine::manual(item.clone(), "KEH", true);
        assert_eq!(linked.ordered, Some(0));
        assert!(linked.is_manual_addition);

        let free = CartLine::manual(item, "KEH", false);
        assert_eq!(free.ordered, None);
        assert!(!free.is_manual_addition);
    }

    #[test]
    fn quantities_clamp_into_stepper_range() {
        assert_eq!(clamp_quantity(-3), 0);
        assert_eq!(clamp_quantity(12), 12);
        assert_eq!(clamp_quantity(1500), QTY_MAX);
    }
}
