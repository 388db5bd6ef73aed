use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inbound_catalog::Inventory;
use inbound_purchasing::{OrderNumber, PurchaseOrder, ReceiptMaster};
use inbound_tickets::TicketConfig;

/// Read-only host data a receipt session works against.
///
/// Snapshotted at session start; the engine never mutates it. New-item
/// detection at finalize compares against exactly this snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingContext {
    pub inventory: Inventory,
    pub orders: Vec<PurchaseOrder>,
    pub masters: Vec<ReceiptMaster>,
    pub ticket_config: TicketConfig,
}

impl ReceivingContext {
    pub fn order(&self, number: &OrderNumber) -> Option<&PurchaseOrder> {
        self.orders.iter().find(|o| &o.number == number)
    }
}

/// Standard intake vs. return processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptMode {
    Standard,
    Return,
}

/// How to bootstrap a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Order to link immediately (the "receive this order" entry point).
    pub initial_order: Option<OrderNumber>,
    pub mode: ReceiptMode,
    pub opened_at: DateTime<Utc>,
}

impl OpenOptions {
    /// Blank standard receipt.
    pub fn standard(opened_at: DateTime<Utc>) -> Self {
        Self { initial_order: None, mode: ReceiptMode::Standard, opened_at }
    }

    /// Return processing against a specific order.
    pub fn return_for(order: OrderNumber, opened_at: DateTime<Utc>) -> Self {
        Self {
            initial_order: Some(order),
            mode: ReceiptMode::Return,
            opened_at,
        }
    }
}
