use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use receiptdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, ValueObject};
use receiptdesk_events::Event;
use receiptdesk_receipts::{ReceiptType, StockKey};

/// Supplier order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierOrderId(pub AggregateId);

impl SupplierOrderId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for SupplierOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SupplierOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SupplierOrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateId::from_str(s).map(Self)
    }
}

/// Supplier order status lifecycle (forward only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierOrderStatus {
    Requested,
    Processed,
    Shipped,
    Delivered,
}

impl SupplierOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierOrderStatus::Requested => "REQUESTED",
            SupplierOrderStatus::Processed => "PROCESSED",
            SupplierOrderStatus::Shipped => "SHIPPED",
            SupplierOrderStatus::Delivered => "DELIVERED",
        }
    }
}

impl core::fmt::Display for SupplierOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing details captured when the supplier delivers. `amount` is in centavos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Billing {
    pub billing_invoice_no: String,
    pub amount: u64,
    pub delivery_receipt_no: String,
    pub delivery_date: NaiveDate,
}

impl ValueObject for Billing {}

/// Aggregate root: SupplierOrder (stock bought for a branch's warehouse allocation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierOrder {
    id: SupplierOrderId,
    branch_id: UserId,
    receipt_type: ReceiptType,
    quantity_units: u32,
    status: SupplierOrderStatus,
    request_date: Option<NaiveDate>,
    billing: Option<Billing>,
    prf_number: Option<String>,
    is_paid: bool,
    version: u64,
    created: bool,
}

impl SupplierOrder {
    pub fn empty(id: SupplierOrderId) -> Self {
        Self {
            id,
            branch_id: UserId::default(),
            receipt_type: ReceiptType::SalesInvoice,
            quantity_units: 0,
            status: SupplierOrderStatus::Requested,
            request_date: None,
            billing: None,
            prf_number: None,
            is_paid: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SupplierOrderId {
        self.id
    }

    pub fn branch_id(&self) -> UserId {
        self.branch_id
    }

    pub fn receipt_type(&self) -> ReceiptType {
        self.receipt_type
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.branch_id, self.receipt_type)
    }

    pub fn quantity_units(&self) -> u32 {
        self.quantity_units
    }

    pub fn status(&self) -> SupplierOrderStatus {
        self.status
    }

    pub fn request_date(&self) -> Option<NaiveDate> {
        self.request_date
    }

    pub fn billing(&self) -> Option<&Billing> {
        self.billing.as_ref()
    }

    pub fn prf_number(&self) -> Option<&str> {
        self.prf_number.as_deref()
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn to_record(&self) -> SupplierOrderRecord {
        SupplierOrderRecord {
            id: self.id,
            branch_id: self.branch_id,
            receipt_type: self.receipt_type,
            quantity_units: self.quantity_units,
            status: self.status,
            request_date: self.request_date,
            billing_invoice_no: self.billing.as_ref().map(|b| b.billing_invoice_no.clone()),
            amount: self.billing.as_ref().map(|b| b.amount),
            delivery_receipt_no: self.billing.as_ref().map(|b| b.delivery_receipt_no.clone()),
            delivery_date: self.billing.as_ref().map(|b| b.delivery_date),
            prf_number: self.prf_number.clone(),
            is_paid: self.is_paid,
        }
    }

    pub fn from_record(record: SupplierOrderRecord) -> Result<Self, DomainError> {
        if record.quantity_units == 0 {
            return Err(DomainError::validation(format!(
                "supplier order {} has no units",
                record.id
            )));
        }

        let billing = match (
            record.billing_invoice_no,
            record.amount,
            record.delivery_receipt_no,
            record.delivery_date,
        ) {
            (Some(billing_invoice_no), Some(amount), Some(delivery_receipt_no), Some(delivery_date)) => {
                Some(Billing {
                    billing_invoice_no,
                    amount,
                    delivery_receipt_no,
                    delivery_date,
                })
            }
            _ => None,
        };
        if record.status == SupplierOrderStatus::Delivered && billing.is_none() {
            return Err(DomainError::validation(format!(
                "supplier order {} is delivered without billing details",
                record.id
            )));
        }

        Ok(Self {
            id: record.id,
            branch_id: record.branch_id,
            receipt_type: record.receipt_type,
            quantity_units: record.quantity_units,
            status: record.status,
            request_date: record.request_date,
            billing,
            prf_number: record.prf_number,
            is_paid: record.is_paid,
            version: 0,
            created: true,
        })
    }
}

impl AggregateRoot for SupplierOrder {
    type Id = SupplierOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Flat supplier order record (export/import shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierOrderRecord {
    pub id: SupplierOrderId,
    pub branch_id: UserId,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub status: SupplierOrderStatus,
    pub request_date: Option<NaiveDate>,
    pub billing_invoice_no: Option<String>,
    pub amount: Option<u64>,
    pub delivery_receipt_no: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub prf_number: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
}

/// Command: RequestSupply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSupply {
    pub order_id: SupplierOrderId,
    pub branch_id: UserId,
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub request_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkProcessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkProcessed {
    pub order_id: SupplierOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkShipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkShipped {
    pub order_id: SupplierOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmDelivery {
    pub order_id: SupplierOrderId,
    pub billing: Billing,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachPrf (payment request form number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachPrf {
    pub order_id: SupplierOrderId,
    pub prf_number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPaid {
    pub order_id: SupplierOrderId,
    pub paid: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierOrderCommand {
    RequestSupply(RequestSupply),
    MarkProcessed(MarkProcessed),
    MarkShipped(MarkShipped),
    ConfirmDelivery(ConfirmDelivery),
    AttachPrf(AttachPrf),
    SetPaid(SetPaid),
}

/// Event: SupplyRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRequested {
    pub order_id: SupplierOrderId,
    pub branch_id: UserId,
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub request_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplyProcessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyProcessed {
    pub order_id: SupplierOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplyShipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyShipped {
    pub order_id: SupplierOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplyDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyDelivered {
    pub order_id: SupplierOrderId,
    pub billing: Billing,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PrfAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrfAttached {
    pub order_id: SupplierOrderId,
    pub prf_number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentMarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMarked {
    pub order_id: SupplierOrderId,
    pub paid: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierOrderEvent {
    SupplyRequested(SupplyRequested),
    SupplyProcessed(SupplyProcessed),
    SupplyShipped(SupplyShipped),
    SupplyDelivered(SupplyDelivered),
    PrfAttached(PrfAttached),
    PaymentMarked(PaymentMarked),
}

impl SupplierOrderEvent {
    pub fn order_id(&self) -> SupplierOrderId {
        match self {
            SupplierOrderEvent::SupplyRequested(e) => e.order_id,
            SupplierOrderEvent::SupplyProcessed(e) => e.order_id,
            SupplierOrderEvent::SupplyShipped(e) => e.order_id,
            SupplierOrderEvent::SupplyDelivered(e) => e.order_id,
            SupplierOrderEvent::PrfAttached(e) => e.order_id,
            SupplierOrderEvent::PaymentMarked(e) => e.order_id,
        }
    }
}

impl Event for SupplierOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SupplierOrderEvent::SupplyRequested(_) => "purchasing.supplier_order.requested",
            SupplierOrderEvent::SupplyProcessed(_) => "purchasing.supplier_order.processed",
            SupplierOrderEvent::SupplyShipped(_) => "purchasing.supplier_order.shipped",
            SupplierOrderEvent::SupplyDelivered(_) => "purchasing.supplier_order.delivered",
            SupplierOrderEvent::PrfAttached(_) => "purchasing.supplier_order.prf_attached",
            SupplierOrderEvent::PaymentMarked(_) => "purchasing.supplier_order.payment_marked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SupplierOrderEvent::SupplyRequested(e) => e.occurred_at,
            SupplierOrderEvent::SupplyProcessed(e) => e.occurred_at,
            SupplierOrderEvent::SupplyShipped(e) => e.occurred_at,
            SupplierOrderEvent::SupplyDelivered(e) => e.occurred_at,
            SupplierOrderEvent::PrfAttached(e) => e.occurred_at,
            SupplierOrderEvent::PaymentMarked(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SupplierOrder {
    type Command = SupplierOrderCommand;
    type Event = SupplierOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SupplierOrderEvent::SupplyRequested(e) => {
                self.id = e.order_id;
                self.branch_id = e.branch_id;
                self.receipt_type = e.receipt_type;
                self.quantity_units = e.quantity_units;
                self.status = SupplierOrderStatus::Requested;
                self.request_date = Some(e.request_date);
                self.is_paid = false;
                self.created = true;
            }
            SupplierOrderEvent::SupplyProcessed(_) => {
                self.status = SupplierOrderStatus::Processed;
            }
            SupplierOrderEvent::SupplyShipped(_) => {
                self.status = SupplierOrderStatus::Shipped;
            }
            SupplierOrderEvent::SupplyDelivered(e) => {
                self.status = SupplierOrderStatus::Delivered;
                self.billing = Some(e.billing.clone());
            }
            SupplierOrderEvent::PrfAttached(e) => {
                self.prf_number = Some(e.prf_number.clone());
            }
            SupplierOrderEvent::PaymentMarked(e) => {
                self.is_paid = e.paid;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SupplierOrderCommand::RequestSupply(cmd) => self.handle_request(cmd),
            SupplierOrderCommand::MarkProcessed(cmd) => self.handle_process(cmd),
            SupplierOrderCommand::MarkShipped(cmd) => self.handle_ship(cmd),
            SupplierOrderCommand::ConfirmDelivery(cmd) => self.handle_deliver(cmd),
            SupplierOrderCommand::AttachPrf(cmd) => self.handle_prf(cmd),
            SupplierOrderCommand::SetPaid(cmd) => self.handle_paid(cmd),
        }
    }
}

impl SupplierOrder {
    fn ensure_order(&self, order_id: SupplierOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("supplier order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::precondition("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(&self, allowed: &[SupplierOrderStatus], action: &str) -> Result<(), DomainError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(DomainError::precondition(format!(
            "cannot {action} supplier order {} in status {}",
            self.id, self.status
        )))
    }

    fn handle_request(&self, cmd: &RequestSupply) -> Result<Vec<SupplierOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("supplier order already exists"));
        }
        if cmd.quantity_units == 0 {
            return Err(DomainError::validation("quantity must be at least one unit"));
        }

        Ok(vec![SupplierOrderEvent::SupplyRequested(SupplyRequested {
            order_id: cmd.order_id,
            branch_id: cmd.branch_id,
            receipt_type: cmd.receipt_type,
            quantity_units: cmd.quantity_units,
            request_date: cmd.request_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_process(&self, cmd: &MarkProcessed) -> Result<Vec<SupplierOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[SupplierOrderStatus::Requested], "process")?;

        Ok(vec![SupplierOrderEvent::SupplyProcessed(SupplyProcessed {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_ship(&self, cmd: &MarkShipped) -> Result<Vec<SupplierOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(
            &[SupplierOrderStatus::Requested, SupplierOrderStatus::Processed],
            "ship",
        )?;

        Ok(vec![SupplierOrderEvent::SupplyShipped(SupplyShipped {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deliver(&self, cmd: &ConfirmDelivery) -> Result<Vec<SupplierOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(
            &[SupplierOrderStatus::Processed, SupplierOrderStatus::Shipped],
            "confirm delivery of",
        )?;

        let invoice = cmd.billing.billing_invoice_no.trim();
        if invoice.is_empty() {
            return Err(DomainError::validation("billing invoice number cannot be empty"));
        }
        let dr = cmd.billing.delivery_receipt_no.trim();
        if dr.is_empty() {
            return Err(DomainError::validation("delivery receipt number cannot be empty"));
        }

        Ok(vec![SupplierOrderEvent::SupplyDelivered(SupplyDelivered {
            order_id: cmd.order_id,
            billing: Billing {
                billing_invoice_no: invoice.to_string(),
                amount: cmd.billing.amount,
                delivery_receipt_no: dr.to_string(),
                delivery_date: cmd.billing.delivery_date,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_prf(&self, cmd: &AttachPrf) -> Result<Vec<SupplierOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[SupplierOrderStatus::Delivered], "attach a PRF to")?;

        if self.prf_number.is_some() {
            return Err(DomainError::precondition(format!(
                "supplier order {} already has a PRF number",
                self.id
            )));
        }
        let prf = cmd.prf_number.trim();
        if prf.is_empty() {
            return Err(DomainError::validation("PRF number cannot be empty"));
        }

        Ok(vec![SupplierOrderEvent::PrfAttached(PrfAttached {
            order_id: cmd.order_id,
            prf_number: prf.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_paid(&self, cmd: &SetPaid) -> Result<Vec<SupplierOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[SupplierOrderStatus::Delivered], "record payment for")?;

        if self.is_paid == cmd.paid {
            return Ok(vec![]);
        }

        Ok(vec![SupplierOrderEvent::PaymentMarked(PaymentMarked {
            order_id: cmd.order_id,
            paid: cmd.paid,
            occurred_at: cmd.occurred_at,
        })])
    }
}
