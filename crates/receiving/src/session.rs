//! Session orchestration.
//!
//! `ReceiptSession` is the single caller between a host and the draft: it
//! runs commands through `handle`, applies the resulting events, logs them,
//! and turns the outward-facing ones into [`Effect`]s the host consumes.
//! Materialization is where entropy lives (ticket ids, message timestamps);
//! everything below the session stays deterministic.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use inbound_core::{Aggregate, AggregateRoot, DomainResult};
use inbound_events::Event;
use inbound_tickets::Ticket;

use crate::draft::{CompletedReceipt, ReceiptCommand, ReceiptDraft, ReceiptEvent};
use crate::posting::StockMovement;

/// Outward-facing result of a command round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Open this ticket in the host's ticket system.
    OpenTicket(Ticket),
    /// Record this movement in the host's stock ledger.
    LogStock(StockMovement),
    /// The receipt is done; persist it and close the flow.
    Complete(CompletedReceipt),
}

/// Drives a [`ReceiptDraft`] on behalf of a host.
#[derive(Debug, Clone)]
pub struct ReceiptSession {
    draft: ReceiptDraft,
}

impl ReceiptSession {
    pub fn new(draft: ReceiptDraft) -> Self {
        Self { draft }
    }

    pub fn draft(&self) -> &ReceiptDraft {
        &self.draft
    }

    pub fn into_draft(self) -> ReceiptDraft {
        self.draft
    }

    /// Execute one command: decide, apply, materialize.
    ///
    /// Either every event of the command is applied or none is (`handle`
    /// fails before anything changes). The returned effects are in event
    /// order; an empty list means the command only changed draft state.
    pub fn execute(&mut self, command: ReceiptCommand) -> DomainResult<Vec<Effect>> {
        let events = self.draft.handle(&command)?;

        let mut effects = Vec::new();
        for event in &events {
            self.draft.apply(event);
            debug!(
                receipt = %self.draft.id(),
                event = event.event_type(),
                version = self.draft.version(),
                "event applied"
            );
            if let Some(effect) = materialize(event) {
                effects.push(effect);
            }
        }

        if self.draft.submitted() {
            info!(
                receipt = %self.draft.id(),
                status = %self.draft.status(),
                "receipt finalized"
            );
        }
        Ok(effects)
    }
}

fn materialize(event: &ReceiptEvent) -> Option<Effect> {
    match event {
        ReceiptEvent::TicketRequested(e) => {
            Some(Effect::OpenTicket(e.ticket.clone().open(e.occurred_at)))
        }
        ReceiptEvent::StockPosted(e) => Some(Effect::LogStock(e.movement.clone())),
        ReceiptEvent::ReceiptFinalized(e) => Some(Effect::Complete(e.receipt.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};
    use inbound_catalog::{Inventory, ItemId, ItemStatus, Sku, StockItem};
    use inbound_core::{AggregateId, DomainError};
    use inbound_purchasing::{
        DeliveredLine, Delivery, OrderKind, OrderLine, OrderNumber, PurchaseOrder, ReceiptMaster,
    };
    use inbound_tickets::{TicketConfig, TicketPriority, TicketStatus};

    use crate::cart::RejectionReason;
    use crate::context::{OpenOptions, ReceivingContext};
    use crate::draft::{
        BatchId, Finalize, HeaderField, LinkOrder, Navigate, ReceiptId, SetReceived, SetRejected,
        SetRejectionReason, StepDirection, UpdateHeader,
    };
    use crate::posting::StockDirection;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_context(config: TicketConfig) -> ReceivingContext {
        let akku = StockItem {
            id: ItemId::new(AggregateId::new()),
            name: "Akku 18V".to_string(),
            sku: Sku::new("A-100"),
            system: "HLU".to_string(),
            category: "Material".to_string(),
            stock_level: 7,
            min_stock: 1,
            location: "KEH".to_string(),
            status: ItemStatus::Active,
            updated_at: test_time(),
        };
        ReceivingContext {
            inventory: Inventory::new(vec![akku]),
            orders: vec![PurchaseOrder {
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
                    expected: 10,
                    received: 4,
                }],
            }],
            masters: vec![ReceiptMaster {
                order_number: OrderNumber::new("BE-1"),
                deliveries: vec![Delivery {
                    lines: vec![DeliveredLine { sku: Sku::new("A-100"), accepted: 4 }],
                }],
            }],
            ticket_config: config,
        }
    }

    fn session(config: TicketConfig) -> ReceiptSession {
        inbound_observability::init();
        let draft = ReceiptDraft::open(
            ReceiptId::new(AggregateId::new()),
            test_context(config),
            OpenOptions::standard(test_time()),
        )
        .unwrap();
        ReceiptSession::new(draft)
    }

    fn session_on_summary(config: TicketConfig) -> ReceiptSession {
        let mut s = session(config);
        s.execute(ReceiptCommand::UpdateHeader(UpdateHeader {
            field: HeaderField::DeliveryNote("LS-1".to_string()),
            occurred_at: test_time(),
        }))
        .unwrap();
        s.execute(ReceiptCommand::LinkOrder(LinkOrder {
            order: OrderNumber::new("BE-1"),
            occurred_at: test_time(),
        }))
        .unwrap();
        for _ in 0..2 {
            s.execute(ReceiptCommand::Navigate(Navigate {
                direction: StepDirection::Forward,
                occurred_at: test_time(),
            }))
            .unwrap();
        }
        s
    }

    #[test]
    fn state_only_commands_produce_no_effects() {
        let mut s = session(TicketConfig::default());
        let effects = s
            .execute(ReceiptCommand::UpdateHeader(UpdateHeader {
                field: HeaderField::DeliveryNote("LS-1".to_string()),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(s.draft().header().delivery_note, "LS-1");
        assert_eq!(s.draft().version(), 1);
    }

    #[test]
    fn failed_commands_leave_the_draft_untouched() {
        let mut s = session(TicketConfig::default());
        let before = s.draft().clone();
        let err = s
            .execute(ReceiptCommand::SetReceived(SetReceived {
                line: 9,
                quantity: 1,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
        assert_eq!(s.draft(), &before);
    }

    #[test]
    fn ticket_requests_materialize_as_open_high_priority_tickets() {
        let mut s = session(TicketConfig { auto_case: true, extra: false });
        s.execute(ReceiptCommand::LinkOrder(LinkOrder {
            order: OrderNumber::new("BE-1"),
            occurred_at: test_time(),
        }))
        .unwrap();
        s.execute(ReceiptCommand::SetRejected(SetRejected {
            line: 0,
            quantity: 2,
            occurred_at: test_time(),
        }))
        .unwrap();

        let stamped = test_time();
        let effects = s
            .execute(ReceiptCommand::SetRejectionReason(SetRejectionReason {
                line: 0,
                reason: Some(RejectionReason::Damaged),
                occurred_at: stamped,
            }))
            .unwrap();

        assert_eq!(effects.len(), 1);
        let Effect::OpenTicket(ticket) = &effects[0] else {
            panic!("expected a ticket effect");
        };
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::High);
        assert_eq!(ticket.receipt_ref, "BE-1");
        assert_eq!(ticket.messages.len(), 1);
        assert_eq!(ticket.messages[0].sent_at, stamped);
    }

    #[test]
    fn each_materialized_ticket_gets_its_own_id() {
        let mut s = session(TicketConfig { auto_case: true, extra: false });
        s.execute(ReceiptCommand::LinkOrder(LinkOrder {
            order: OrderNumber::new("BE-1"),
            occurred_at: test_time(),
        }))
        .unwrap();
        s.execute(ReceiptCommand::SetRejected(SetRejected {
            line: 0,
            quantity: 2,
            occurred_at: test_time(),
        }))
        .unwrap();

        let mut ids = Vec::new();
        for reason in [RejectionReason::Damaged, RejectionReason::Wrong] {
            let effects = s
                .execute(ReceiptCommand::SetRejectionReason(SetRejectionReason {
                    line: 0,
                    reason: Some(reason),
                    occurred_at: test_time(),
                }))
                .unwrap();
            let Effect::OpenTicket(ticket) = &effects[0] else {
                panic!("expected a ticket effect");
            };
            ids.push(ticket.id);
        }
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn finalize_yields_stock_and_completion_effects_in_event_order() {
        let mut s = session_on_summary(TicketConfig::default());
        let batch_id = BatchId::new(AggregateId::new());
        let effects = s
            .execute(ReceiptCommand::Finalize(Finalize { batch_id, occurred_at: test_time() }))
            .unwrap();

        assert_eq!(effects.len(), 2);
        let Effect::LogStock(movement) = &effects[0] else {
            panic!("expected the stock movement first");
        };
        assert_eq!(movement.direction, StockDirection::Add);
        assert_eq!(movement.quantity, 6);

        let Effect::Complete(receipt) = &effects[1] else {
            panic!("expected the completion last");
        };
        assert_eq!(receipt.batch_id, batch_id);
        assert!(s.draft().submitted());
    }

    #[test]
    fn finalize_with_complaint_opens_the_consolidated_ticket() {
        let mut s = session_on_summary(TicketConfig { auto_case: false, extra: false });
        s.execute(ReceiptCommand::SetRejected(SetRejected {
            line: 0,
            quantity: 6,
            occurred_at: test_time(),
        }))
        .unwrap();

        let batch_id = BatchId::new(AggregateId::new());
        let effects = s
            .execute(ReceiptCommand::Finalize(Finalize { batch_id, occurred_at: test_time() }))
            .unwrap();

        // Fully rejected line: a complaint and the completion, no movement.
        assert_eq!(effects.len(), 2);
        let Effect::OpenTicket(ticket) = &effects[0] else {
            panic!("expected the complaint ticket first");
        };
        assert_eq!(ticket.receipt_ref, batch_id.to_string());
        assert!(matches!(effects[1], Effect::Complete(_)));
    }
}
