use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use inbound_catalog::Sku;

use crate::order::OrderNumber;

/// Accepted quantity for one SKU within a past delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredLine {
    pub sku: Sku,
    pub accepted: i64,
}

/// One completed delivery against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub lines: Vec<DeliveredLine>,
}

/// Delivery history of a single purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptMaster {
    pub order_number: OrderNumber,
    pub deliveries: Vec<Delivery>,
}

impl ReceiptMaster {
    /// Total accepted quantity per SKU across all recorded deliveries.
    pub fn accepted_by_sku(&self) -> HashMap<Sku, i64> {
        let mut totals = HashMap::new();
        for delivery in &self.deliveries {
            for line in &delivery.lines {
                *totals.entry(line.sku.clone()).or_insert(0) += line.accepted;
            }
        }
        totals
    }
}

/// Per-SKU accepted history for one order; empty when the order has no
/// recorded deliveries yet.
pub fn accepted_history(masters: &[ReceiptMaster], order: &OrderNumber) -> HashMap<Sku, i64> {
    masters
        .iter()
        .find(|m| &m.order_number == order)
        .map(ReceiptMaster::accepted_by_sku)
        .unwrap_or_default()
}
