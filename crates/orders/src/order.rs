use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use receiptdesk_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use receiptdesk_events::Event;
use receiptdesk_receipts::{ReceiptType, SeriesRange, StockKey, units_to_receipts};

/// Receipt order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptOrderId(pub AggregateId);

impl ReceiptOrderId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for ReceiptOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ReceiptOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ReceiptOrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateId::from_str(s).map(Self)
    }
}

/// Receipt order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Approved,
    InTransit,
    Delivered,
    Received,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether a series range has been assigned (shipment left the warehouse).
    pub fn is_shipped(&self) -> bool {
        matches!(
            self,
            OrderStatus::InTransit | OrderStatus::Delivered | OrderStatus::Received
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: ReceiptOrder (a branch's request for receipt stock).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptOrder {
    id: ReceiptOrderId,
    branch_id: UserId,
    branch_name: String,
    company: String,
    receipt_type: ReceiptType,
    quantity_units: u32,
    status: OrderStatus,
    request_date: Option<NaiveDate>,
    delivery_date: Option<NaiveDate>,
    series: Option<SeriesRange>,
    received_by: Option<String>,
    version: u64,
    created: bool,
}

impl ReceiptOrder {
    pub fn empty(id: ReceiptOrderId) -> Self {
        Self {
            id,
            branch_id: UserId::default(),
            branch_name: String::new(),
            company: String::new(),
            receipt_type: ReceiptType::SalesInvoice,
            quantity_units: 0,
            status: OrderStatus::Pending,
            request_date: None,
            delivery_date: None,
            series: None,
            received_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ReceiptOrderId {
        self.id
    }

    pub fn branch_id(&self) -> UserId {
        self.branch_id
    }

    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    pub fn company(&self) -> &str {
        &self.company
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

    /// Individual receipts the order amounts to.
    pub fn total_receipts(&self) -> u64 {
        units_to_receipts(self.receipt_type, self.quantity_units)
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn request_date(&self) -> Option<NaiveDate> {
        self.request_date
    }

    pub fn delivery_date(&self) -> Option<NaiveDate> {
        self.delivery_date
    }

    pub fn series(&self) -> Option<SeriesRange> {
        self.series
    }

    pub fn received_by(&self) -> Option<&str> {
        self.received_by.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn to_record(&self) -> ReceiptOrderRecord {
        ReceiptOrderRecord {
            id: self.id,
            branch_id: self.branch_id,
            branch_name: self.branch_name.clone(),
            company: self.company.clone(),
            receipt_type: self.receipt_type,
            quantity_units: self.quantity_units,
            status: self.status,
            request_date: self.request_date,
            delivery_date: self.delivery_date,
            series_start: self.series.map(|r| r.start),
            series_end: self.series.map(|r| r.end),
            received_by: self.received_by.clone(),
        }
    }

    pub fn from_record(record: ReceiptOrderRecord) -> Result<Self, DomainError> {
        if record.quantity_units == 0 {
            return Err(DomainError::validation(format!(
                "order {} has no units",
                record.id
            )));
        }
        let series = match (record.series_start, record.series_end) {
            (Some(start), Some(end)) if start >= 1 && start <= end => Some(SeriesRange { start, end }),
            (None, None) => None,
            _ => {
                return Err(DomainError::validation(format!(
                    "order {} has an incomplete series range",
                    record.id
                )));
            }
        };
        if record.status.is_shipped() && series.is_none() {
            return Err(DomainError::validation(format!(
                "order {} is {} without a series range",
                record.id, record.status
            )));
        }

        Ok(Self {
            id: record.id,
            branch_id: record.branch_id,
            branch_name: record.branch_name,
            company: record.company,
            receipt_type: record.receipt_type,
            quantity_units: record.quantity_units,
            status: record.status,
            request_date: record.request_date,
            delivery_date: record.delivery_date,
            series,
            received_by: record.received_by,
            version: 0,
            created: true,
        })
    }
}

impl AggregateRoot for ReceiptOrder {
    type Id = ReceiptOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Flat order record (export/import shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptOrderRecord {
    pub id: ReceiptOrderId,
    pub branch_id: UserId,
    pub branch_name: String,
    pub company: String,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub status: OrderStatus,
    pub request_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub series_start: Option<u64>,
    pub series_end: Option<u64>,
    pub received_by: Option<String>,
}

/// Command: RequestOrder. Branch name and company are snapshotted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrder {
    pub order_id: ReceiptOrderId,
    pub branch_id: UserId,
    pub branch_name: String,
    pub company: String,
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub request_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditRequest (only while pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub order_id: ReceiptOrderId,
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveOrder {
    pub order_id: ReceiptOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ShipOrder. The range is computed by the caller from the branch's
/// series high-water mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOrder {
    pub order_id: ReceiptOrderId,
    pub range: SeriesRange,
    pub shipped_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDelivered {
    pub order_id: ReceiptOrderId,
    pub delivered_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmReceipt {
    pub order_id: ReceiptOrderId,
    pub received_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: ReceiptOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptOrderCommand {
    RequestOrder(RequestOrder),
    EditRequest(EditRequest),
    ApproveOrder(ApproveOrder),
    ShipOrder(ShipOrder),
    MarkDelivered(MarkDelivered),
    ConfirmReceipt(ConfirmReceipt),
    CancelOrder(CancelOrder),
}

/// Event: OrderRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequested {
    pub order_id: ReceiptOrderId,
    pub branch_id: UserId,
    pub branch_name: String,
    pub company: String,
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub request_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEdited {
    pub order_id: ReceiptOrderId,
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderApproved {
    pub order_id: ReceiptOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderShipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipped {
    pub order_id: ReceiptOrderId,
    pub range: SeriesRange,
    pub shipped_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDelivered {
    pub order_id: ReceiptOrderId,
    pub delivered_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptConfirmed {
    pub order_id: ReceiptOrderId,
    pub received_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: ReceiptOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptOrderEvent {
    OrderRequested(OrderRequested),
    RequestEdited(RequestEdited),
    OrderApproved(OrderApproved),
    OrderShipped(OrderShipped),
    OrderDelivered(OrderDelivered),
    ReceiptConfirmed(ReceiptConfirmed),
    OrderCancelled(OrderCancelled),
}

impl ReceiptOrderEvent {
    pub fn order_id(&self) -> ReceiptOrderId {
        match self {
            ReceiptOrderEvent::OrderRequested(e) => e.order_id,
            ReceiptOrderEvent::RequestEdited(e) => e.order_id,
            ReceiptOrderEvent::OrderApproved(e) => e.order_id,
            ReceiptOrderEvent::OrderShipped(e) => e.order_id,
            ReceiptOrderEvent::OrderDelivered(e) => e.order_id,
            ReceiptOrderEvent::ReceiptConfirmed(e) => e.order_id,
            ReceiptOrderEvent::OrderCancelled(e) => e.order_id,
        }
    }
}

impl Event for ReceiptOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceiptOrderEvent::OrderRequested(_) => "orders.receipt_order.requested",
            ReceiptOrderEvent::RequestEdited(_) => "orders.receipt_order.edited",
            ReceiptOrderEvent::OrderApproved(_) => "orders.receipt_order.approved",
            ReceiptOrderEvent::OrderShipped(_) => "orders.receipt_order.shipped",
            ReceiptOrderEvent::OrderDelivered(_) => "orders.receipt_order.delivered",
            ReceiptOrderEvent::ReceiptConfirmed(_) => "orders.receipt_order.received",
            ReceiptOrderEvent::OrderCancelled(_) => "orders.receipt_order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceiptOrderEvent::OrderRequested(e) => e.occurred_at,
            ReceiptOrderEvent::RequestEdited(e) => e.occurred_at,
            ReceiptOrderEvent::OrderApproved(e) => e.occurred_at,
            ReceiptOrderEvent::OrderShipped(e) => e.occurred_at,
            ReceiptOrderEvent::OrderDelivered(e) => e.occurred_at,
            ReceiptOrderEvent::ReceiptConfirmed(e) => e.occurred_at,
            ReceiptOrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ReceiptOrder {
    type Command = ReceiptOrderCommand;
    type Event = ReceiptOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReceiptOrderEvent::OrderRequested(e) => {
                self.id = e.order_id;
                self.branch_id = e.branch_id;
                self.branch_name = e.branch_name.clone();
                self.company = e.company.clone();
                self.receipt_type = e.receipt_type;
                self.quantity_units = e.quantity_units;
                self.status = OrderStatus::Pending;
                self.request_date = Some(e.request_date);
                self.created = true;
            }
            ReceiptOrderEvent::RequestEdited(e) => {
                self.receipt_type = e.receipt_type;
                self.quantity_units = e.quantity_units;
            }
            ReceiptOrderEvent::OrderApproved(_) => {
                self.status = OrderStatus::Approved;
            }
            ReceiptOrderEvent::OrderShipped(e) => {
                self.status = OrderStatus::InTransit;
                self.series = Some(e.range);
                self.delivery_date = Some(e.shipped_on);
            }
            ReceiptOrderEvent::OrderDelivered(e) => {
                self.status = OrderStatus::Delivered;
                self.delivery_date = Some(e.delivered_on);
            }
            ReceiptOrderEvent::ReceiptConfirmed(e) => {
                self.status = OrderStatus::Received;
                self.received_by = Some(e.received_by.clone());
            }
            ReceiptOrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReceiptOrderCommand::RequestOrder(cmd) => self.handle_request(cmd),
            ReceiptOrderCommand::EditRequest(cmd) => self.handle_edit(cmd),
            ReceiptOrderCommand::ApproveOrder(cmd) => self.handle_approve(cmd),
            ReceiptOrderCommand::ShipOrder(cmd) => self.handle_ship(cmd),
            ReceiptOrderCommand::MarkDelivered(cmd) => self.handle_mark_delivered(cmd),
            ReceiptOrderCommand::ConfirmReceipt(cmd) => self.handle_confirm(cmd),
            ReceiptOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl ReceiptOrder {
    fn ensure_order(&self, order_id: ReceiptOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::precondition("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(&self, allowed: &[OrderStatus], action: &str) -> Result<(), DomainError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(DomainError::precondition(format!(
            "cannot {action} order {} in status {}",
            self.id, self.status
        )))
    }

    fn handle_request(&self, cmd: &RequestOrder) -> Result<Vec<ReceiptOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.quantity_units == 0 {
            return Err(DomainError::validation("quantity must be at least one unit"));
        }

        Ok(vec![ReceiptOrderEvent::OrderRequested(OrderRequested {
            order_id: cmd.order_id,
            branch_id: cmd.branch_id,
            branch_name: cmd.branch_name.clone(),
            company: cmd.company.clone(),
            receipt_type: cmd.receipt_type,
            quantity_units: cmd.quantity_units,
            request_date: cmd.request_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditRequest) -> Result<Vec<ReceiptOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Pending], "edit")?;
        if cmd.quantity_units == 0 {
            return Err(DomainError::validation("quantity must be at least one unit"));
        }

        Ok(vec![ReceiptOrderEvent::RequestEdited(RequestEdited {
            order_id: cmd.order_id,
            receipt_type: cmd.receipt_type,
            quantity_units: cmd.quantity_units,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveOrder) -> Result<Vec<ReceiptOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Pending], "approve")?;

        Ok(vec![ReceiptOrderEvent::OrderApproved(OrderApproved {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_ship(&self, cmd: &ShipOrder) -> Result<Vec<ReceiptOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Approved], "ship")?;

        if cmd.range.is_empty() || cmd.range.len() != self.total_receipts() {
            return Err(DomainError::validation(format!(
                "series {}..={} does not match {} receipts ordered",
                cmd.range.start,
                cmd.range.end,
                self.total_receipts()
            )));
        }

        Ok(vec![ReceiptOrderEvent::OrderShipped(OrderShipped {
            order_id: cmd.order_id,
            range: cmd.range,
            shipped_on: cmd.shipped_on,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_delivered(
        &self,
        cmd: &MarkDelivered,
    ) -> Result<Vec<ReceiptOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::InTransit], "mark delivered")?;

        Ok(vec![ReceiptOrderEvent::OrderDelivered(OrderDelivered {
            order_id: cmd.order_id,
            delivered_on: cmd.delivered_on,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmReceipt) -> Result<Vec<ReceiptOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Delivered], "confirm receipt of")?;

        let received_by = cmd.received_by.trim();
        if received_by.is_empty() {
            return Err(DomainError::validation("received by cannot be empty"));
        }

        Ok(vec![ReceiptOrderEvent::ReceiptConfirmed(ReceiptConfirmed {
            order_id: cmd.order_id,
            received_by: received_by.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<ReceiptOrderEvent>, DomainError> {
        self.ensure_order(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Pending, OrderStatus::Approved], "cancel")?;

        Ok(vec![ReceiptOrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
