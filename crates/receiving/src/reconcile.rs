//! Quantity reconciliation.
//!
//! Pure arithmetic over a cart line: ordered vs. previously received vs.
//! received today vs. rejected. Nothing here mutates state; callers
//! recompute after every change instead of caching.

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;

/// Reconciled view of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCalc {
    pub ordered: i64,
    pub previously_received: i64,
    pub received: i64,
    pub rejected: i64,
    /// Previously received plus received today.
    pub total_delivered: i64,
    /// Kept quantity beyond what was ordered; never negative.
    pub over_delivered: i64,
    /// Ordered but not yet kept; never negative.
    pub open: i64,
}

pub fn line_calc(line: &CartLine) -> LineCalc {
    let ordered = line.ordered.unwrap_or(0);
    let previously_received = line.previously_received.unwrap_or(0);
    let total_delivered = previously_received + line.received;
    let kept = total_delivered - line.rejected;

    LineCalc {
        ordered,
        previously_received,
        received: line.received,
        rejected: line.rejected,
        total_delivered,
        over_delivered: (kept - ordered).max(0),
        open: (ordered - kept).max(0),
    }
}

/// Traffic-light signal shown next to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSignal {
    /// Fully reconciled.
    Green,
    /// Open quantity remains.
    Amber,
    /// Over-delivered; takes precedence over any open quantity.
    Orange,
}

pub fn line_signal(line: &CartLine) -> LineSignal {
    let calc = line_calc(line);
    if calc.over_delivered > 0 {
        LineSignal::Orange
    } else if calc.open > 0 {
        LineSignal::Amber
    } else {
        LineSignal::Green
    }
}

/// Cart-wide sums shown on the summary step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub open: i64,
    pub over_delivered: i64,
    pub rejected: i64,
    /// Signed: negative when the cart removes more than it books.
    pub accepted: i64,
}

pub fn cart_totals(cart: &[CartLine]) -> CartTotals {
    let mut totals = CartTotals::default();
    for line in cart {
        let calc = line_calc(line);
        totals.open += calc.open;
        totals.over_delivered += calc.over_delivered;
        totals.rejected += line.rejected;
        totals.accepted += line.accepted;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inbound_catalog::{Sku, StockItem};
    use proptest::prelude::*;

    fn line(ordered: Option<i64>, prior: Option<i64>, received: i64, rejected: i64) -> CartLine {
        let item = StockItem::placeholder("Akku 18V", Sku::new("A-100"), "KEH", Utc::now());
        let mut l = CartLine::from_order_line(item, 0, 0, 0, "KEH");
        l.ordered = ordered;
        l.previously_received = prior;
        l.set_quantities(received, rejected);
        l
    }

    #[test]
    fn completed_order_line_is_green() {
        // Ordered 10, 4 received earlier, 6 today, nothing rejected.
        let l = line(Some(10), Some(4), 6, 0);
        let c = line_calc(&l);
        assert_eq!(c.total_delivered, 10);
        assert_eq!(c.open, 0);
        assert_eq!(c.over_delivered, 0);
        assert_eq!(line_signal(&l), LineSignal::Green);
    }

    #[test]
    fn surplus_shows_orange_even_with_rejections() {
        // Ordered 10, 12 today: two too many.
        let l = line(Some(10), Some(0), 12, 0);
        assert_eq!(line_calc(&l).over_delivered, 2);
        assert_eq!(line_signal(&l), LineSignal::Orange);
    }

    #[test]
    fn rejections_reopen_a_line() {
        let l = line(Some(10), Some(0), 10, 3);
        let c = line_calc(&l);
        assert_eq!(c.open, 3);
        assert_eq!(c.over_delivered, 0);
        assert_eq!(line_signal(&l), LineSignal::Amber);
    }

    #[test]
    fn unlinked_line_defaults_to_zero_ordered() {
        let l = line(None, None, 5, 0);
        let c = line_calc(&l);
        assert_eq!(c.ordered, 0);
        assert_eq!(c.over_delivered, 5);
        assert_eq!(line_signal(&l), LineSignal::Orange);
    }

    #[test]
    fn totals_sum_across_lines_with_signed_accepted() {
        let lines = vec![line(Some(10), Some(0), 4, 0), line(Some(5), Some(0), 2, 6)];
        let totals = cart_totals(&lines);
        assert_eq!(totals.open, 6 + 9);
        assert_eq!(totals.over_delivered, 0);
        assert_eq!(totals.rejected, 6);
        assert_eq!(totals.accepted, 4 - 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Open and over-delivered quantities are never negative, and an
        /// over-delivery forces the orange signal regardless of open.
        #[test]
        fn reconciliation_never_goes_negative(
            ordered in prop::option::of(0i64..999),
            prior in prop::option::of(0i64..999),
            received in 0i64..999,
            rejected in 0i64..999,
        ) {
            let l = line(ordered, prior, received, rejected);
            let c = line_calc(&l);

            prop_assert!(c.open >= 0);
            prop_assert!(c.over_delivered >= 0);
            prop_assert!(!(c.open > 0 && c.over_delivered > 0));
            if c.over_delivered > 0 {
                prop_assert_eq!(line_signal(&l), LineSignal::Orange);
            }
            prop_assert_eq!(l.accepted, l.received - l.rejected);
        }
    }
}
