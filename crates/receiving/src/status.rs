//! Receipt status derivation.
//!
//! A priority-ordered rule chain over the whole cart plus the linked order's
//! delivery history. Earlier rules short-circuit later ones; reordering them
//! changes the business meaning.

use serde::{Deserialize, Serialize};

use inbound_purchasing::{accepted_history, PurchaseOrder, ReceiptMaster};

use crate::cart::{CartLine, RejectionReason};

/// Overall label of a goods receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Every line was rejected in full.
    Rejected,
    DamageAndWrong,
    Damage,
    WrongDelivery,
    Overdelivery,
    PartialDelivery,
    Booked,
}

impl core::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            ReceiptStatus::Rejected => "Rejected",
            ReceiptStatus::DamageAndWrong => "Damage + Wrong",
            ReceiptStatus::Damage => "Damage",
            ReceiptStatus::WrongDelivery => "Wrong Delivery",
            ReceiptStatus::Overdelivery => "Overdelivery",
            ReceiptStatus::PartialDelivery => "Partial Delivery",
            ReceiptStatus::Booked => "Booked",
        };
        f.write_str(label)
    }
}

fn rejected_for(cart: &[CartLine], reason: RejectionReason) -> bool {
    cart.iter()
        .any(|l| l.rejection_reason == Some(reason) && l.rejected > 0)
}

/// Derive the receipt status from the current cart and the linked order.
///
/// `order`/`masters` feed rule 5 (order-level over/under comparison against
/// the full delivery history); with no linked order only the rejection rules
/// apply.
pub fn derive_status(
    cart: &[CartLine],
    order: Option<&PurchaseOrder>,
    masters: &[ReceiptMaster],
) -> ReceiptStatus {
    // 1. Everything rejected, and something was actually delivered.
    let all_rejected = !cart.is_empty()
        && cart.iter().all(|l| l.rejected == l.received)
        && cart.iter().any(|l| l.received > 0);
    if all_rejected {
        return ReceiptStatus::Rejected;
    }

    // 2.–4. Rejection-reason rules.
    let has_damage = rejected_for(cart, RejectionReason::Damaged);
    let has_wrong = rejected_for(cart, RejectionReason::Wrong);
    match (has_damage, has_wrong) {
        (true, true) => return ReceiptStatus::DamageAndWrong,
        (true, false) => return ReceiptStatus::Damage,
        (false, true) => return ReceiptStatus::WrongDelivery,
        (false, false) => {}
    }

    let any_rejection = cart.iter().any(|l| l.rejected > 0);

    // 5. Order-level comparison against expected quantities plus history.
    if let Some(order) = order {
        let history = accepted_history(masters, &order.number);
        let mut any_over = false;
        let mut any_under = false;
        for order_line in &order.lines {
            let prior = history.get(&order_line.sku).copied().unwrap_or(0);
            let session = cart
                .iter()
                .find(|l| l.item.sku == order_line.sku)
                .map(|l| l.accepted)
                .unwrap_or(0);
            let total = prior + session;
            if total > order_line.expected {
                any_over = true;
            }
            if total < order_line.expected {
                any_under = true;
            }
        }
        if any_over {
            return ReceiptStatus::Overdelivery;
        }
        if any_under || any_rejection {
            return ReceiptStatus::PartialDelivery;
        }
        return ReceiptStatus::Booked;
    }

    // 6. Free receipt without an order.
    if any_rejection {
        ReceiptStatus::PartialDelivery
    } else {
        ReceiptStatus::Booked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use inbound_catalog::{Sku, StockItem};
    use inbound_purchasing::{DeliveredLine, Delivery, OrderKind, OrderLine, OrderNumber};

    fn line(sku: &str, received: i64, rejected: i64) -> CartLine {
        let item = StockItem::placeholder("Akku 18V", Sku::new(sku), "KEH", Utc::now());
        let mut l = CartLine::from_order_line(item, 10, 0, 0, "KEH");
        l.set_quantities(received, rejected);
        l
    }

    fn rejected_line(sku: &str, received: i64, rejected: i64, reason: RejectionReason) -> CartLine {
        let mut l = line(sku, received, rejected);
        l.rejection_reason = Some(reason);
        l
    }

    fn order(expected: i64) -> PurchaseOrder {
        PurchaseOrder {
            number: OrderNumber::new("BE-1"),
            supplier: "Brandt".to_string(),
            created_on: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            kind: OrderKind::Stock,
            cancelled: false,
            archived: false,
            force_closed: false,
            lines: vec![OrderLine {
                sku: Sku::new("A-100"),
                name: "Akku 18V".to_string(),
                expected,
                received: 0,
            }],
        }
    }

    fn master(accepted: i64) -> ReceiptMaster {
        ReceiptMaster {
            order_number: OrderNumber::new("BE-1"),
            deliveries: vec![Delivery {
                lines: vec![DeliveredLine { sku: Sku::new("A-100"), accepted }],
            }],
        }
    }

    #[test]
    fn fully_rejected_delivery_wins_over_damage() {
        let cart = vec![rejected_line("A-100", 5, 5, RejectionReason::Damaged)];
        assert_eq!(derive_status(&cart, None, &[]), ReceiptStatus::Rejected);
    }

    #[test]
    fn one_untouched_line_breaks_the_all_rejected_rule() {
        let cart = vec![
            rejected_line("A-100", 5, 5, RejectionReason::Damaged),
            line("B-200", 3, 0),
        ];
        assert_eq!(derive_status(&cart, None, &[]), ReceiptStatus::Damage);
    }

    #[test]
    fn damage_and_wrong_combine() {
        let cart = vec![
            rejected_line("A-100", 5, 2, RejectionReason::Damaged),
            rejected_line("B-200", 5, 1, RejectionReason::Wrong),
        ];
        assert_eq!(derive_status(&cart, None, &[]), ReceiptStatus::DamageAndWrong);
    }

    #[test]
    fn wrong_delivery_alone() {
        let cart = vec![rejected_line("A-100", 5, 1, RejectionReason::Wrong), line("B-200", 1, 0)];
        assert_eq!(derive_status(&cart, None, &[]), ReceiptStatus::WrongDelivery);
    }

    #[test]
    fn reason_without_quantity_does_not_count() {
        let mut l = line("A-100", 5, 0);
        l.rejection_reason = Some(RejectionReason::Damaged);
        assert_eq!(derive_status(&[l], None, &[]), ReceiptStatus::Booked);
    }

    #[test]
    fn order_fully_served_across_history_is_booked() {
        // Ordered 10, 4 from history, 6 this session.
        let cart = vec![line("A-100", 6, 0)];
        let order = order(10);
        let masters = vec![master(4)];
        assert_eq!(derive_status(&cart, Some(&order), &masters), ReceiptStatus::Booked);
    }

    #[test]
    fn order_served_beyond_expected_is_overdelivery() {
        let cart = vec![line("A-100", 12, 0)];
        let order = order(10);
        assert_eq!(derive_status(&cart, Some(&order), &[]), ReceiptStatus::Overdelivery);
    }

    #[test]
    fn short_order_line_is_partial_delivery() {
        let cart = vec![line("A-100", 4, 0)];
        let order = order(10);
        assert_eq!(derive_status(&cart, Some(&order), &[]), ReceiptStatus::PartialDelivery);
    }

    #[test]
    fn served_order_with_other_rejection_is_partial_delivery() {
        // Quantity adds up, but an "other" rejection on a second line keeps
        // the receipt from booking clean.
        let mut extra = rejected_line("B-200", 3, 1, RejectionReason::Other);
        extra.ordered = None;
        let cart = vec![line("A-100", 10, 0), extra];
        let order = order(10);
        assert_eq!(
            derive_status(&cart, Some(&order), &[]),
            ReceiptStatus::PartialDelivery
        );
    }

    #[test]
    fn free_receipt_defaults_to_booked() {
        let cart = vec![line("A-100", 5, 0)];
        assert_eq!(derive_status(&cart, None, &[]), ReceiptStatus::Booked);
    }

    #[test]
    fn free_receipt_with_other_rejection_is_partial() {
        let cart = vec![rejected_line("A-100", 5, 1, RejectionReason::Other), line("B-200", 2, 0)];
        assert_eq!(derive_status(&cart, None, &[]), ReceiptStatus::PartialDelivery);
    }

    #[test]
    fn empty_cart_is_never_rejected() {
        assert_eq!(derive_status(&[], None, &[]), ReceiptStatus::Booked);
    }
}
