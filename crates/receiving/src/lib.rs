//! Goods-receipt engine.
//!
//! Models the warehouse intake flow as deterministic domain logic: a
//! `ReceiptDraft` aggregate walked through header, line-check and summary
//! steps, a pure reconciliation/status layer on top of the cart, and outward
//! effects (tickets, stock movements, the completed receipt) expressed as
//! events instead of callbacks. The `ReceiptSession` orchestrator applies
//! events and hands materialized effects to the embedding host.

pub mod cart;
pub mod context;
pub mod draft;
pub mod posting;
pub mod reconcile;
pub mod session;
pub mod status;
pub mod ticketing;

pub use cart::{CartLine, RejectionReason, QTY_MAX};
pub use context::{OpenOptions, ReceiptMode, ReceivingContext};
pub use draft::{
    AddItem, AnnotateRejection, BatchId, CompletedReceipt, ConfirmReturn, Finalize, HeaderField,
    LinkOrder, Navigate, ReceiptCommand, ReceiptDraft, ReceiptEvent, ReceiptHeader, ReceiptId,
    ReceiptStep, SetAdminClose, SetForceClose, SetReceived, SetRejected, SetRejectionReason,
    StepDirection, ToggleIssuePanel, UpdateHeader,
};
pub use posting::{MovementContext, StockDirection, StockMovement, StockPosting};
pub use reconcile::{cart_totals, line_calc, line_signal, CartTotals, LineCalc, LineSignal};
pub use session::{Effect, ReceiptSession};
pub use status::{derive_status, ReceiptStatus};
