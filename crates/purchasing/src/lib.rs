//! Purchasing module.
//!
//! Purchase orders and their delivery history are owned by the host; this
//! crate models them as read-only inputs to the receiving flow, plus the
//! open-order query behind the order-selection picker.

pub mod history;
pub mod order;

pub use history::{accepted_history, DeliveredLine, Delivery, ReceiptMaster};
pub use order::{open_orders, OrderKind, OrderLine, OrderNumber, PurchaseOrder};
