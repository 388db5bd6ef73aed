//! Ticket builders for rejected and over-delivered goods.
//!
//! Two emission paths exist side by side: per-event tickets raised the
//! moment a return is confirmed or an issue reason is set, and one
//! consolidated complaint ticket at finalize time. A rejection can therefore
//! surface on both channels; hosts treating that as duplication can ignore
//! one of them (see DESIGN.md).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inbound_purchasing::OrderNumber;
use inbound_tickets::{TicketConfig, TicketDraft};

use crate::cart::{CartLine, RejectionReason};
use crate::reconcile::line_calc;

const BLANK: &str = "–";

fn dash_or(value: &str) -> &str {
    if value.is_empty() { BLANK } else { value }
}

/// Reference shown in ticket subjects: the linked order number, else the
/// delivery-note number, else a dash.
fn order_ref(order: Option<&OrderNumber>, delivery_note: &str) -> String {
    if let Some(order) = order {
        return order.as_str().to_string();
    }
    dash_or(delivery_note).to_string()
}

/// Receipt reference of per-event tickets: the linked order number, or a
/// pending marker derived from the event time while no order is linked.
fn receipt_ref(order: Option<&OrderNumber>, occurred_at: DateTime<Utc>) -> String {
    match order {
        Some(order) => order.as_str().to_string(),
        None => format!("pending-{}", occurred_at.timestamp_millis()),
    }
}

/// Ticket raised when a return is confirmed for a line.
pub fn return_ticket(
    line: &CartLine,
    quantity: i64,
    reason: &str,
    carrier: &str,
    tracking: &str,
    order: Option<&OrderNumber>,
    delivery_note: &str,
    occurred_at: DateTime<Utc>,
) -> TicketDraft {
    let reference = order_ref(order, delivery_note);
    TicketDraft {
        receipt_ref: receipt_ref(order, occurred_at),
        subject: format!("Return – {} ({reference})", line.item.name),
        body: format!(
            "Automatic return:\n\
             • Item: {} ({})\n\
             • Quantity: {quantity} pcs\n\
             • Reason: {}\n\
             • Carrier: {}\n\
             • Tracking: {}\n\
             • Order: {reference}",
            line.item.name,
            line.item.sku,
            dash_or(reason),
            dash_or(carrier),
            dash_or(tracking),
        ),
    }
}

/// Ticket raised when the issue panel flags a line as damaged or wrong.
///
/// Only meaningful for those two reasons; callers gate on that.
pub fn issue_ticket(
    line: &CartLine,
    reason: RejectionReason,
    order: Option<&OrderNumber>,
    delivery_note: &str,
    occurred_at: DateTime<Utc>,
) -> TicketDraft {
    let kind = match reason {
        RejectionReason::Damaged => IssueKind::Damage,
        _ => IssueKind::WrongDelivery,
    };
    let reference = order_ref(order, delivery_note);
    TicketDraft {
        receipt_ref: receipt_ref(order, occurred_at),
        subject: format!("{kind} – {} ({reference})", line.item.name),
        body: format!(
            "Automatically flagged:\n\
             • Type: {kind}\n\
             • Item: {} ({})\n\
             • Rejected: {} pcs\n\
             • Order: {reference}",
            line.item.name, line.item.sku, line.rejected,
        ),
    }
}

/// Issue category named in the consolidated complaint subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Damage,
    WrongDelivery,
    Overdelivery,
    Deviation,
}

impl core::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            IssueKind::Damage => "Damage",
            IssueKind::WrongDelivery => "Wrong delivery",
            IssueKind::Overdelivery => "Overdelivery",
            IssueKind::Deviation => "Deviation",
        };
        f.write_str(label)
    }
}

fn issue_kind(reason: RejectionReason) -> Option<IssueKind> {
    match reason {
        RejectionReason::Damaged => Some(IssueKind::Damage),
        RejectionReason::Wrong => Some(IssueKind::WrongDelivery),
        RejectionReason::Overdelivery => Some(IssueKind::Overdelivery),
        RejectionReason::Other => Some(IssueKind::Deviation),
    }
}

/// The consolidated complaint ticket built at finalize time, or `None` when
/// the cart gives no reason to complain.
///
/// One entry per rejected line; with the `extra` flag, overage entries for
/// lines whose history-plus-session total exceeds the ordered quantity.
pub fn complaint_ticket(
    cart: &[CartLine],
    config: TicketConfig,
    batch_ref: &str,
) -> Option<TicketDraft> {
    let mut entries: Vec<String> = Vec::new();
    let mut kinds: Vec<IssueKind> = Vec::new();
    let mut note = |kind: Option<IssueKind>| {
        if let Some(kind) = kind {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    };

    for line in cart {
        let label = format!("{} ({})", line.item.name, line.item.sku);
        if line.rejected > 0 {
            let reason = line
                .rejection_reason
                .map(|r| r.label())
                .unwrap_or(RejectionReason::Other.label());
            entries.push(format!(
                "{label}: {}x rejected ({reason}) - {}",
                line.rejected, line.rejection_notes
            ));
            note(line.rejection_reason.and_then(issue_kind));
        }
        if config.extra && line.ordered.is_some() && line.accepted > 0 {
            let calc = line_calc(line);
            let total = calc.previously_received + line.accepted;
            if total > calc.ordered {
                entries.push(format!("[Overdelivery] {label}: {} pcs over", total - calc.ordered));
                note(Some(IssueKind::Overdelivery));
            }
        }
    }

    if entries.is_empty() {
        return None;
    }

    let subject = kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(TicketDraft {
        receipt_ref: batch_ref.to_string(),
        subject: format!("Complaint: {subject}"),
        body: format!("Automatically created case:\n\n{}", entries.join("\n")),
    })
}
