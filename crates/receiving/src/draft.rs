//! The in-progress goods receipt, modeled as an aggregate.
//!
//! `handle` is pure decision logic returning events; `apply` evolves state.
//! Outward effects (tickets, stock movements, the completed receipt) are
//! events too; the session layer materializes them for the host.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use inbound_catalog::{ItemId, StockItem};
use inbound_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult};
use inbound_events::Event;
use inbound_purchasing::{accepted_history, OrderKind, OrderNumber, PurchaseOrder};
use inbound_tickets::TicketDraft;

use crate::cart::{clamp_quantity, CartLine, RejectionReason};
use crate::context::{OpenOptions, ReceiptMode, ReceivingContext};
use crate::posting::{build_postings, movement_for, new_items, MovementContext, StockMovement, StockPosting};
use crate::reconcile::{cart_totals, line_calc, CartTotals};
use crate::status::{derive_status, ReceiptStatus};
use crate::ticketing::{complaint_ticket, issue_ticket, return_ticket};

/// Delivery-note marker of an admin close ("close without delivery").
pub const CLOSE_NOTE_PREFIX: &str = "ABSCHLUSS-";

/// Delivery-note marker of return processing.
pub const RETURN_NOTE_PREFIX: &str = "RÜK-";

/// Fallback intake area used when return processing cannot infer a location.
const DEFAULT_RETURN_LOCATION: &str = "Wareneingang";

/// Receipt draft identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub AggregateId);

impl ReceiptId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Posting-batch identifier minted at finalize time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub AggregateId);

impl BatchId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStep {
    Header,
    Lines,
    Summary,
}

/// Delivery metadata collected on the header step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptHeader {
    pub delivery_note: String,
    pub order_number: Option<OrderNumber>,
    pub supplier: String,
    pub delivery_date: NaiveDate,
    pub location: String,
}

/// Everything the host needs to persist a finalized receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedReceipt {
    pub batch_id: BatchId,
    pub header: ReceiptHeader,
    pub status: ReceiptStatus,
    /// One posting per cart line, zero-quantity lines included.
    pub postings: Vec<StockPosting>,
    /// Items this receipt brings into existence.
    pub new_items: Vec<StockItem>,
    pub force_close: bool,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Editable header field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderField {
    DeliveryNote(String),
    Supplier(String),
    DeliveryDate(NaiveDate),
    Location(String),
}

/// Command: UpdateHeader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHeader {
    pub field: HeaderField,
    pub occurred_at: DateTime<Utc>,
}

/// Command: LinkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOrder {
    pub order: OrderNumber,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetAdminClose (close the order with zero physical delivery).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAdminClose {
    pub enabled: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddItem (manual search-and-add).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetReceived (quantity delivered today).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReceived {
    pub line: usize,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRejected {
    pub line: usize,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetRejectionReason (issue-panel reason picker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRejectionReason {
    pub line: usize,
    pub reason: Option<RejectionReason>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AnnotateRejection (issue-panel notes/carrier/tracking edits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotateRejection {
    pub line: usize,
    pub notes: Option<String>,
    pub carrier: Option<String>,
    pub tracking: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ToggleIssuePanel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleIssuePanel {
    pub line: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmReturn (return-popup confirmation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmReturn {
    pub line: usize,
    pub quantity: i64,
    pub reason: String,
    pub carrier: String,
    pub tracking: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetForceClose (summary-step manual override).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetForceClose {
    pub enabled: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    Forward,
    Back,
}

/// Command: Navigate between wizard steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigate {
    pub direction: StepDirection,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finalize {
    pub batch_id: BatchId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptCommand {
    UpdateHeader(UpdateHeader),
    LinkOrder(LinkOrder),
    SetAdminClose(SetAdminClose),
    AddItem(AddItem),
    SetReceived(SetReceived),
    SetRejected(SetRejected),
    SetRejectionReason(SetRejectionReason),
    AnnotateRejection(AnnotateRejection),
    ToggleIssuePanel(ToggleIssuePanel),
    ConfirmReturn(ConfirmReturn),
    SetForceClose(SetForceClose),
    Navigate(Navigate),
    Finalize(Finalize),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Event: HeaderUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderUpdated {
    pub field: HeaderField,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderLinked (cart replaced by the seeded order lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLinked {
    pub order: OrderNumber,
    pub supplier: String,
    pub lines: Vec<CartLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AdminCloseEnabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCloseEnabled {
    pub delivery_note: String,
    pub supplier: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AdminCloseDisabled (cart re-seeded as a fresh order selection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCloseDisabled {
    pub clear_note: bool,
    pub lines: Vec<CartLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub line: CartLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantitiesChanged.
///
/// The accepted quantity is not carried; `apply` derives it, which is the
/// single enforcement point of the `accepted == received - rejected`
/// invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitiesChanged {
    pub line: usize,
    pub received: i64,
    pub rejected: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RejectionReasonChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReasonChanged {
    pub line: usize,
    pub reason: Option<RejectionReason>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RejectionAnnotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionAnnotated {
    pub line: usize,
    pub notes: Option<String>,
    pub carrier: Option<String>,
    pub tracking: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: IssuePanelToggled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePanelToggled {
    pub line: usize,
    pub open: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnRecorded (adds to the rejected quantity and stamps the
/// overdelivery reason plus shipping details).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRecorded {
    pub line: usize,
    pub quantity: i64,
    pub notes: String,
    pub carrier: String,
    pub tracking: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ForceCloseChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceCloseChanged {
    pub enabled: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StepChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepChanged {
    pub step: ReceiptStep,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TicketRequested (outward; no state change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequested {
    pub ticket: TicketDraft,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockPosted (outward; no state change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosted {
    pub movement: StockMovement,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptFinalized (outward; marks the draft submitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFinalized {
    pub receipt: CompletedReceipt,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptEvent {
    HeaderUpdated(HeaderUpdated),
    OrderLinked(OrderLinked),
    AdminCloseEnabled(AdminCloseEnabled),
    AdminCloseDisabled(AdminCloseDisabled),
    LineAdded(LineAdded),
    QuantitiesChanged(QuantitiesChanged),
    RejectionReasonChanged(RejectionReasonChanged),
    RejectionAnnotated(RejectionAnnotated),
    IssuePanelToggled(IssuePanelToggled),
    ReturnRecorded(ReturnRecorded),
    ForceCloseChanged(ForceCloseChanged),
    StepChanged(StepChanged),
    TicketRequested(TicketRequested),
    StockPosted(StockPosted),
    ReceiptFinalized(ReceiptFinalized),
}

impl Event for ReceiptEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceiptEvent::HeaderUpdated(_) => "receiving.header.updated",
            ReceiptEvent::OrderLinked(_) => "receiving.order.linked",
            ReceiptEvent::AdminCloseEnabled(_) => "receiving.admin_close.enabled",
            ReceiptEvent::AdminCloseDisabled(_) => "receiving.admin_close.disabled",
            ReceiptEvent::LineAdded(_) => "receiving.line.added",
            ReceiptEvent::QuantitiesChanged(_) => "receiving.line.quantities_changed",
            ReceiptEvent::RejectionReasonChanged(_) => "receiving.line.rejection_reason_changed",
            ReceiptEvent::RejectionAnnotated(_) => "receiving.line.rejection_annotated",
            ReceiptEvent::IssuePanelToggled(_) => "receiving.line.issue_panel_toggled",
            ReceiptEvent::ReturnRecorded(_) => "receiving.line.return_recorded",
            ReceiptEvent::ForceCloseChanged(_) => "receiving.force_close.changed",
            ReceiptEvent::StepChanged(_) => "receiving.step.changed",
            ReceiptEvent::TicketRequested(_) => "receiving.ticket.requested",
            ReceiptEvent::StockPosted(_) => "receiving.stock.posted",
            ReceiptEvent::ReceiptFinalized(_) => "receiving.receipt.finalized",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceiptEvent::HeaderUpdated(e) => e.occurred_at,
            ReceiptEvent::OrderLinked(e) => e.occurred_at,
            ReceiptEvent::AdminCloseEnabled(e) => e.occurred_at,
            ReceiptEvent::AdminCloseDisabled(e) => e.occurred_at,
            ReceiptEvent::LineAdded(e) => e.occurred_at,
            ReceiptEvent::QuantitiesChanged(e) => e.occurred_at,
            ReceiptEvent::RejectionReasonChanged(e) => e.occurred_at,
            ReceiptEvent::RejectionAnnotated(e) => e.occurred_at,
            ReceiptEvent::IssuePanelToggled(e) => e.occurred_at,
            ReceiptEvent::ReturnRecorded(e) => e.occurred_at,
            ReceiptEvent::ForceCloseChanged(e) => e.occurred_at,
            ReceiptEvent::StepChanged(e) => e.occurred_at,
            ReceiptEvent::TicketRequested(e) => e.occurred_at,
            ReceiptEvent::StockPosted(e) => e.occurred_at,
            ReceiptEvent::ReceiptFinalized(e) => e.occurred_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Aggregate root: the in-progress goods receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptDraft {
    id: ReceiptId,
    context: ReceivingContext,
    mode: ReceiptMode,
    step: ReceiptStep,
    header: ReceiptHeader,
    admin_close: bool,
    force_close: bool,
    cart: Vec<CartLine>,
    submitted: bool,
    version: u64,
}

impl ReceiptDraft {
    /// Open a draft against a snapshot of host data.
    ///
    /// With an initial order the order is linked immediately; return mode
    /// additionally pre-fills the delivery note and location and opens on
    /// the line step.
    pub fn open(id: ReceiptId, context: ReceivingContext, options: OpenOptions) -> DomainResult<Self> {
        let mut draft = Self {
            id,
            context,
            mode: options.mode,
            step: ReceiptStep::Header,
            header: ReceiptHeader {
                delivery_note: String::new(),
                order_number: None,
                supplier: String::new(),
                delivery_date: options.opened_at.date_naive(),
                location: String::new(),
            },
            admin_close: false,
            force_close: false,
            cart: Vec::new(),
            submitted: false,
            version: 0,
        };

        if let Some(number) = options.initial_order {
            let events = draft.handle(&ReceiptCommand::LinkOrder(LinkOrder {
                order: number,
                occurred_at: options.opened_at,
            }))?;
            for event in &events {
                draft.apply(event);
            }

            if options.mode == ReceiptMode::Return {
                let note = format!(
                    "{RETURN_NOTE_PREFIX}{}",
                    options.opened_at.date_naive().format("%d%m%Y")
                );
                let location = draft.return_location();
                for field in [HeaderField::DeliveryNote(note), HeaderField::Location(location)] {
                    draft.apply(&ReceiptEvent::HeaderUpdated(HeaderUpdated {
                        field,
                        occurred_at: options.opened_at,
                    }));
                }
                draft.apply(&ReceiptEvent::StepChanged(StepChanged {
                    step: ReceiptStep::Lines,
                    occurred_at: options.opened_at,
                }));
            }
        }

        Ok(draft)
    }

    pub fn mode(&self) -> ReceiptMode {
        self.mode
    }

    pub fn step(&self) -> ReceiptStep {
        self.step
    }

    pub fn header(&self) -> &ReceiptHeader {
        &self.header
    }

    pub fn cart(&self) -> &[CartLine] {
        &self.cart
    }

    pub fn admin_close(&self) -> bool {
        self.admin_close
    }

    pub fn force_close(&self) -> bool {
        self.force_close
    }

    pub fn submitted(&self) -> bool {
        self.submitted
    }

    pub fn context(&self) -> &ReceivingContext {
        &self.context
    }

    pub fn linked_order(&self) -> Option<&PurchaseOrder> {
        self.header
            .order_number
            .as_ref()
            .and_then(|number| self.context.order(number))
    }

    /// Current status label, always derived from current state.
    pub fn status(&self) -> ReceiptStatus {
        derive_status(&self.cart, self.linked_order(), &self.context.masters)
    }

    pub fn totals(&self) -> CartTotals {
        cart_totals(&self.cart)
    }

    /// An order is linked and some ordered quantity is still open; the
    /// summary step offers the manual force-close override in this state.
    pub fn partial_delivery(&self) -> bool {
        self.header.order_number.is_some() && self.cart.iter().any(|l| line_calc(l).open > 0)
    }
}

impl AggregateRoot for ReceiptDraft {
    type Id = ReceiptId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for ReceiptDraft {
    type Command = ReceiptCommand;
    type Event = ReceiptEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReceiptEvent::HeaderUpdated(e) => match &e.field {
                HeaderField::DeliveryNote(v) => self.header.delivery_note = v.clone(),
                HeaderField::Supplier(v) => self.header.supplier = v.clone(),
                HeaderField::DeliveryDate(v) => self.header.delivery_date = *v,
                HeaderField::Location(v) => {
                    self.header.location = v.clone();
                    for line in &mut self.cart {
                        line.location = v.clone();
                    }
                }
            },
            ReceiptEvent::OrderLinked(e) => {
                self.header.order_number = Some(e.order.clone());
                self.header.supplier = e.supplier.clone();
                self.cart = e.lines.clone();
            }
            ReceiptEvent::AdminCloseEnabled(e) => {
                self.admin_close = true;
                self.force_close = true;
                self.header.delivery_note = e.delivery_note.clone();
                self.header.supplier = e.supplier.clone();
                for line in &mut self.cart {
                    line.set_quantities(0, 0);
                }
            }
            ReceiptEvent::AdminCloseDisabled(e) => {
                self.admin_close = false;
                self.force_close = false;
                if e.clear_note {
                    self.header.delivery_note.clear();
                }
                self.cart = e.lines.clone();
            }
            ReceiptEvent::LineAdded(e) => self.cart.push(e.line.clone()),
            ReceiptEvent::QuantitiesChanged(e) => {
                if let Some(line) = self.cart.get_mut(e.line) {
                    line.set_quantities(e.received, e.rejected);
                }
            }
            ReceiptEvent::RejectionReasonChanged(e) => {
                if let Some(line) = self.cart.get_mut(e.line) {
                    line.rejection_reason = e.reason;
                }
            }
            ReceiptEvent::RejectionAnnotated(e) => {
                if let Some(line) = self.cart.get_mut(e.line) {
                    if let Some(notes) = &e.notes {
                        line.rejection_notes = notes.clone();
                    }
                    if let Some(carrier) = &e.carrier {
                        line.return_carrier = carrier.clone();
                    }
                    if let Some(tracking) = &e.tracking {
                        line.return_tracking = tracking.clone();
                    }
                }
            }
            ReceiptEvent::IssuePanelToggled(e) => {
                if let Some(line) = self.cart.get_mut(e.line) {
                    line.issue_panel_open = e.open;
                }
            }
            ReceiptEvent::ReturnRecorded(e) => {
                if let Some(line) = self.cart.get_mut(e.line) {
                    let rejected = line.rejected + e.quantity;
                    let received = line.received;
                    line.set_quantities(received, rejected);
                    line.rejection_reason = Some(RejectionReason::Overdelivery);
                    line.rejection_notes = e.notes.clone();
                    line.return_carrier = e.carrier.clone();
                    line.return_tracking = e.tracking.clone();
                }
            }
            ReceiptEvent::ForceCloseChanged(e) => self.force_close = e.enabled,
            ReceiptEvent::StepChanged(e) => self.step = e.step,
            // Outward-only events; the session materializes them.
            ReceiptEvent::TicketRequested(_) | ReceiptEvent::StockPosted(_) => {}
            ReceiptEvent::ReceiptFinalized(_) => self.submitted = true,
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if self.submitted {
            return Err(DomainError::conflict("receipt already finalized"));
        }
        match command {
            ReceiptCommand::UpdateHeader(cmd) => self.handle_update_header(cmd),
            ReceiptCommand::LinkOrder(cmd) => self.handle_link_order(cmd),
            ReceiptCommand::SetAdminClose(cmd) => self.handle_set_admin_close(cmd),
            ReceiptCommand::AddItem(cmd) => self.handle_add_item(cmd),
            ReceiptCommand::SetReceived(cmd) => self.handle_set_received(cmd),
            ReceiptCommand::SetRejected(cmd) => self.handle_set_rejected(cmd),
            ReceiptCommand::SetRejectionReason(cmd) => self.handle_set_rejection_reason(cmd),
            ReceiptCommand::AnnotateRejection(cmd) => self.handle_annotate_rejection(cmd),
            ReceiptCommand::ToggleIssuePanel(cmd) => self.handle_toggle_issue_panel(cmd),
            ReceiptCommand::ConfirmReturn(cmd) => self.handle_confirm_return(cmd),
            ReceiptCommand::SetForceClose(cmd) => self.handle_set_force_close(cmd),
            ReceiptCommand::Navigate(cmd) => self.handle_navigate(cmd),
            ReceiptCommand::Finalize(cmd) => self.handle_finalize(cmd),
        }
    }
}

impl ReceiptDraft {
    fn ensure_line(&self, index: usize) -> DomainResult<&CartLine> {
        self.cart.get(index).ok_or_else(DomainError::not_found)
    }

    fn return_location(&self) -> String {
        self.linked_order()
            .and_then(|order| order.lines.first())
            .and_then(|line| self.context.inventory.find_by_sku(&line.sku))
            .map(|item| item.location.clone())
            .filter(|location| !location.is_empty())
            .unwrap_or_else(|| DEFAULT_RETURN_LOCATION.to_string())
    }

    /// Seed one cart line per order line, reusing inventory items by SKU and
    /// synthesizing placeholders for unknown ones. `zeroed` suppresses the
    /// remaining-quantity prefill (admin close).
    fn seed_lines(&self, order: &PurchaseOrder, zeroed: bool, now: DateTime<Utc>) -> Vec<CartLine> {
        let history = accepted_history(&self.context.masters, &order.number);
        order
            .lines
            .iter()
            .map(|order_line| {
                let item = self
                    .context
                    .inventory
                    .find_by_sku(&order_line.sku)
                    .cloned()
                    .unwrap_or_else(|| {
                        StockItem::placeholder(
                            order_line.name.clone(),
                            order_line.sku.clone(),
                            self.header.location.clone(),
                            now,
                        )
                    });
                let prior = history.get(&order_line.sku).copied().unwrap_or(0);
                let remaining = (order_line.expected - prior).max(0);
                let received = if zeroed { 0 } else { remaining };
                CartLine::from_order_line(
                    item,
                    order_line.expected,
                    prior,
                    received,
                    self.header.location.clone(),
                )
            })
            .collect()
    }

    fn movement_context(&self) -> MovementContext {
        match self.linked_order() {
            Some(order) if order.kind == OrderKind::Project => MovementContext::PoProject,
            Some(_) => MovementContext::PoNormal,
            None => MovementContext::Manual,
        }
    }

    fn handle_update_header(&self, cmd: &UpdateHeader) -> DomainResult<Vec<ReceiptEvent>> {
        match &cmd.field {
            HeaderField::DeliveryNote(_) if self.admin_close => {
                return Err(DomainError::validation(
                    "delivery note is managed while admin close is active",
                ));
            }
            HeaderField::Supplier(_) if self.header.order_number.is_some() => {
                return Err(DomainError::validation("supplier is taken from the linked order"));
            }
            HeaderField::Location(_) if self.mode == ReceiptMode::Return => {
                return Err(DomainError::validation("location is fixed during return processing"));
            }
            _ => {}
        }
        Ok(vec![ReceiptEvent::HeaderUpdated(HeaderUpdated {
            field: cmd.field.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_link_order(&self, cmd: &LinkOrder) -> DomainResult<Vec<ReceiptEvent>> {
        let order = self.context.order(&cmd.order).ok_or_else(DomainError::not_found)?;
        if !order.open() {
            return Err(DomainError::validation("order is not open for receiving"));
        }
        let lines = self.seed_lines(order, self.admin_close, cmd.occurred_at);
        Ok(vec![ReceiptEvent::OrderLinked(OrderLinked {
            order: order.number.clone(),
            supplier: order.supplier.clone(),
            lines,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_admin_close(&self, cmd: &SetAdminClose) -> DomainResult<Vec<ReceiptEvent>> {
        let Some(number) = &self.header.order_number else {
            return Err(DomainError::validation("admin close requires a linked order"));
        };
        if cmd.enabled == self.admin_close {
            return Ok(Vec::new());
        }
        let order = self.context.order(number).ok_or_else(DomainError::not_found)?;

        if cmd.enabled {
            let delivery_note = format!(
                "{CLOSE_NOTE_PREFIX}{}",
                cmd.occurred_at.date_naive().format("%Y-%m-%d")
            );
            Ok(vec![ReceiptEvent::AdminCloseEnabled(AdminCloseEnabled {
                delivery_note,
                supplier: order.supplier.clone(),
                occurred_at: cmd.occurred_at,
            })])
        } else {
            Ok(vec![ReceiptEvent::AdminCloseDisabled(AdminCloseDisabled {
                clear_note: self.header.delivery_note.starts_with(CLOSE_NOTE_PREFIX),
                lines: self.seed_lines(order, false, cmd.occurred_at),
                occurred_at: cmd.occurred_at,
            })])
        }
    }

    fn handle_add_item(&self, cmd: &AddItem) -> DomainResult<Vec<ReceiptEvent>> {
        let item = self
            .context
            .inventory
            .get(cmd.item_id)
            .ok_or_else(DomainError::not_found)?
            .clone();
        let line = CartLine::manual(
            item,
            self.header.location.clone(),
            self.header.order_number.is_some(),
        );
        Ok(vec![ReceiptEvent::LineAdded(LineAdded {
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_received(&self, cmd: &SetReceived) -> DomainResult<Vec<ReceiptEvent>> {
        let line = self.ensure_line(cmd.line)?;
        if self.admin_close {
            return Err(DomainError::validation(
                "quantities are fixed while admin close is active",
            ));
        }
        Ok(vec![ReceiptEvent::QuantitiesChanged(QuantitiesChanged {
            line: cmd.line,
            received: clamp_quantity(cmd.quantity),
            rejected: line.rejected,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_rejected(&self, cmd: &SetRejected) -> DomainResult<Vec<ReceiptEvent>> {
        let line = self.ensure_line(cmd.line)?;
        Ok(vec![ReceiptEvent::QuantitiesChanged(QuantitiesChanged {
            line: cmd.line,
            received: line.received,
            rejected: clamp_quantity(cmd.quantity),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_rejection_reason(&self, cmd: &SetRejectionReason) -> DomainResult<Vec<ReceiptEvent>> {
        let line = self.ensure_line(cmd.line)?;
        let mut events = vec![ReceiptEvent::RejectionReasonChanged(RejectionReasonChanged {
            line: cmd.line,
            reason: cmd.reason,
            occurred_at: cmd.occurred_at,
        })];
        if self.context.ticket_config.auto_case {
            if let Some(reason @ (RejectionReason::Damaged | RejectionReason::Wrong)) = cmd.reason {
                events.push(ReceiptEvent::TicketRequested(TicketRequested {
                    ticket: issue_ticket(
                        line,
                        reason,
                        self.header.order_number.as_ref(),
                        &self.header.delivery_note,
                        cmd.occurred_at,
                    ),
                    occurred_at: cmd.occurred_at,
                }));
            }
        }
        Ok(events)
    }

    fn handle_annotate_rejection(&self, cmd: &AnnotateRejection) -> DomainResult<Vec<ReceiptEvent>> {
        self.ensure_line(cmd.line)?;
        Ok(vec![ReceiptEvent::RejectionAnnotated(RejectionAnnotated {
            line: cmd.line,
            notes: cmd.notes.clone(),
            carrier: cmd.carrier.clone(),
            tracking: cmd.tracking.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_toggle_issue_panel(&self, cmd: &ToggleIssuePanel) -> DomainResult<Vec<ReceiptEvent>> {
        let line = self.ensure_line(cmd.line)?;
        Ok(vec![ReceiptEvent::IssuePanelToggled(IssuePanelToggled {
            line: cmd.line,
            open: !line.issue_panel_open,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm_return(&self, cmd: &ConfirmReturn) -> DomainResult<Vec<ReceiptEvent>> {
        let line = self.ensure_line(cmd.line)?;
        if cmd.quantity < 1 {
            return Err(DomainError::validation("return quantity must be at least 1"));
        }
        let mut events = vec![ReceiptEvent::ReturnRecorded(ReturnRecorded {
            line: cmd.line,
            quantity: cmd.quantity,
            notes: cmd.reason.clone(),
            carrier: cmd.carrier.clone(),
            tracking: cmd.tracking.clone(),
            occurred_at: cmd.occurred_at,
        })];
        if self.context.ticket_config.auto_case {
            events.push(ReceiptEvent::TicketRequested(TicketRequested {
                ticket: return_ticket(
                    line,
                    cmd.quantity,
                    &cmd.reason,
                    &cmd.carrier,
                    &cmd.tracking,
                    self.header.order_number.as_ref(),
                    &self.header.delivery_note,
                    cmd.occurred_at,
                ),
                occurred_at: cmd.occurred_at,
            }));
        }
        Ok(events)
    }

    fn handle_set_force_close(&self, cmd: &SetForceClose) -> DomainResult<Vec<ReceiptEvent>> {
        if self.header.order_number.is_none() {
            return Err(DomainError::validation("force close requires a linked order"));
        }
        if cmd.enabled == self.force_close {
            return Ok(Vec::new());
        }
        Ok(vec![ReceiptEvent::ForceCloseChanged(ForceCloseChanged {
            enabled: cmd.enabled,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_navigate(&self, cmd: &Navigate) -> DomainResult<Vec<ReceiptEvent>> {
        let step = match (cmd.direction, self.step) {
            (StepDirection::Forward, ReceiptStep::Header) => {
                if self.header.delivery_note.trim().is_empty() {
                    return Err(DomainError::validation("delivery note is required"));
                }
                ReceiptStep::Lines
            }
            (StepDirection::Forward, ReceiptStep::Lines) => {
                if self.cart.is_empty() {
                    return Err(DomainError::validation("cannot continue with an empty cart"));
                }
                ReceiptStep::Summary
            }
            (StepDirection::Forward, ReceiptStep::Summary) => {
                return Err(DomainError::validation("already on the summary step"));
            }
            (StepDirection::Back, ReceiptStep::Summary) => ReceiptStep::Lines,
            (StepDirection::Back, ReceiptStep::Lines) => ReceiptStep::Header,
            (StepDirection::Back, ReceiptStep::Header) => {
                return Err(DomainError::validation("already on the first step"));
            }
        };
        Ok(vec![ReceiptEvent::StepChanged(StepChanged {
            step,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_finalize(&self, cmd: &Finalize) -> DomainResult<Vec<ReceiptEvent>> {
        if self.step != ReceiptStep::Summary {
            return Err(DomainError::validation("finalize is only available on the summary step"));
        }

        let mut events = Vec::new();

        if self.mode != ReceiptMode::Return {
            if let Some(ticket) = complaint_ticket(
                &self.cart,
                self.context.ticket_config,
                &cmd.batch_id.to_string(),
            ) {
                events.push(ReceiptEvent::TicketRequested(TicketRequested {
                    ticket,
                    occurred_at: cmd.occurred_at,
                }));
            }
        }

        let postings = build_postings(&self.cart);
        let context = self.movement_context();
        for posting in &postings {
            if let Some(movement) = movement_for(posting, &self.header.delivery_note, context) {
                events.push(ReceiptEvent::StockPosted(StockPosted {
                    movement,
                    occurred_at: cmd.occurred_at,
                }));
            }
        }

        let receipt = CompletedReceipt {
            batch_id: cmd.batch_id,
            header: self.header.clone(),
            status: self.status(),
            postings,
            new_items: new_items(&self.cart, &self.context.inventory),
            force_close: self.force_close,
        };
        events.push(ReceiptEvent::ReceiptFinalized(ReceiptFinalized {
            receipt,
            occurred_at: cmd.occurred_at,
        }));
        Ok(events)
    }
}
