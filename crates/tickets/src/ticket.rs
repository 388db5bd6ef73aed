use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inbound_core::AggregateId;

/// Ticket identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub AggregateId);

impl TicketId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TicketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Ticket message identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub AggregateId);

impl MessageId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MessageId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: MessageId,
    pub author: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub kind: MessageKind,
}

/// A support ticket as handed to the host's ticket system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    /// Receipt-side reference: the linked order number, the delivery-note
    /// number, or the posting batch id, depending on the emission path.
    pub receipt_ref: String,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub messages: Vec<TicketMessage>,
}

/// An id-less ticket as emitted by the (deterministic) receiving engine.
///
/// Ids and timestamps are minted when the orchestrating session materializes
/// the draft, keeping command handling free of entropy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub receipt_ref: String,
    pub subject: String,
    pub body: String,
}

impl TicketDraft {
    /// Materialize into a full ticket: open, high priority, with the body
    /// wrapped into a single system message.
    pub fn open(self, sent_at: DateTime<Utc>) -> Ticket {
        Ticket {
            id: TicketId::new(AggregateId::new()),
            receipt_ref: self.receipt_ref,
            subject: self.subject,
            status: TicketStatus::Open,
            priority: TicketPriority::High,
            messages: vec![TicketMessage {
                id: MessageId::new(AggregateId::new()),
                author: "System".to_string(),
                text: self.body,
                sent_at,
                kind: MessageKind::System,
            }],
        }
    }
}

/// Host-configured automation flags for ticket emission.
///
/// `auto_case` drives the per-event tickets (return confirmation, issue
/// reason changes); `extra` additionally reports overages against the
/// ordered quantity in the consolidated finalize ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfig {
    pub auto_case: bool,
    pub extra: bool,
}
