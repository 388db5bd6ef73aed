//! Stock postings derived from a finalized cart.

use serde::{Deserialize, Serialize};

use inbound_catalog::{Inventory, Sku, StockItem};

use crate::cart::{CartLine, RejectionReason};

/// One cart line mapped to a posting record for the host's stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosting {
    pub sku: Sku,
    pub name: String,
    /// Signed: the accepted quantity of the line. Negative postings remove
    /// stock (more rejected than received today).
    pub quantity: i64,
    pub is_damaged: bool,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    Add,
    Remove,
}

/// Where a movement originated, for the host's audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementContext {
    #[serde(rename = "po-normal")]
    PoNormal,
    #[serde(rename = "po-project")]
    PoProject,
    #[serde(rename = "manual")]
    Manual,
}

/// A single ledger entry handed to the host per non-zero posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub sku: Sku,
    pub name: String,
    pub direction: StockDirection,
    /// Magnitude; always positive.
    pub quantity: i64,
    pub source: String,
    pub context: MovementContext,
}

/// Map every cart line to a posting record (zero-quantity lines included;
/// they are filtered only when turned into ledger movements).
pub fn build_postings(cart: &[CartLine]) -> Vec<StockPosting> {
    cart.iter()
        .map(|line| StockPosting {
            sku: line.item.sku.clone(),
            name: line.item.name.clone(),
            quantity: line.accepted,
            is_damaged: line.rejection_reason == Some(RejectionReason::Damaged) && line.rejected > 0,
            notes: if line.rejection_notes.is_empty() {
                line.issue_notes.clone()
            } else {
                line.rejection_notes.clone()
            },
        })
        .collect()
}

/// Ledger movement for a posting; `None` when nothing moves.
pub fn movement_for(
    posting: &StockPosting,
    delivery_note: &str,
    context: MovementContext,
) -> Option<StockMovement> {
    if posting.quantity == 0 {
        return None;
    }
    let direction = if posting.quantity > 0 {
        StockDirection::Add
    } else {
        StockDirection::Remove
    };
    Some(StockMovement {
        sku: posting.sku.clone(),
        name: posting.name.clone(),
        direction,
        quantity: posting.quantity.abs(),
        source: format!("Goods receipt {delivery_note}"),
        context,
    })
}

/// Items the receipt brings into existence: positively booked lines whose
/// item was not part of the inventory snapshot (placeholders synthesized
/// while linking an order, typically).
pub fn new_items(cart: &[CartLine], inventory: &Inventory) -> Vec<StockItem> {
    cart.iter()
        .filter(|l| l.accepted > 0 && !inventory.contains(l.item.id))
        .map(|l| l.item.clone())
        .collect()
}
