//! Support-ticket module.
//!
//! The receiving engine raises tickets for damaged, wrong, and
//! over-delivered goods; storage and follow-up live in the host's ticket
//! system. This crate carries the data model and the automation flags.

pub mod ticket;

pub use ticket::{
    MessageId, MessageKind, Ticket, TicketConfig, TicketDraft, TicketId, TicketMessage,
    TicketPriority, TicketStatus,
};
