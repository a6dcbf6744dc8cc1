use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use receiptdesk_core::{Aggregate, AggregateRoot, DomainError, UserId};
use receiptdesk_events::Event;
use receiptdesk_receipts::{ReceiptType, StockKey, UnitLabel, receipts_per_unit, unit_label_for};

/// Aggregate root: WarehouseItem (units reserved for one branch x type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseItem {
    key: StockKey,
    total_units: u32,
    version: u64,
    created: bool,
}

impl WarehouseItem {
    pub fn empty(key: StockKey) -> Self {
        Self {
            key,
            total_units: 0,
            version: 0,
            created: false,
        }
    }

    pub fn key(&self) -> StockKey {
        self.key
    }

    pub fn branch_id(&self) -> UserId {
        self.key.branch_id
    }

    pub fn receipt_type(&self) -> ReceiptType {
        self.key.receipt_type
    }

    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    pub fn receipts_per_unit(&self) -> u64 {
        receipts_per_unit(self.key.receipt_type)
    }

    pub fn unit_label(&self) -> UnitLabel {
        unit_label_for(self.key.receipt_type)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn to_record(&self) -> WarehouseRecord {
        WarehouseRecord {
            branch_id: self.key.branch_id,
            receipt_type: self.key.receipt_type,
            total_units: self.total_units,
            receipts_per_unit: self.receipts_per_unit(),
            unit_label: self.unit_label(),
        }
    }

    /// Rebuild from a flattened record. Per-unit size and label are derived
    /// from the type, so stale values in the record are ignored.
    pub fn from_record(record: WarehouseRecord) -> Self {
        Self {
            key: StockKey::new(record.branch_id, record.receipt_type),
            total_units: record.total_units,
            version: 0,
            created: true,
        }
    }
}

impl AggregateRoot for WarehouseItem {
    type Id = StockKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Flattened warehouse row (export/import shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseRecord {
    pub branch_id: UserId,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub total_units: u32,
    pub receipts_per_unit: u64,
    pub unit_label: UnitLabel,
}

/// Command: EnsureItem (lazy creation with zero units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureItem {
    pub key: StockKey,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustUnits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustUnits {
    pub key: StockKey,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseCommand {
    EnsureItem(EnsureItem),
    AdjustUnits(AdjustUnits),
}

impl WarehouseCommand {
    pub fn key(&self) -> StockKey {
        match self {
            WarehouseCommand::EnsureItem(c) => c.key,
            WarehouseCommand::AdjustUnits(c) => c.key,
        }
    }
}

/// Event: ItemOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOpened {
    pub key: StockKey,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitsAdjusted. `total_after` is already clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsAdjusted {
    pub key: StockKey,
    pub delta: i64,
    pub total_after: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseEvent {
    ItemOpened(ItemOpened),
    UnitsAdjusted(UnitsAdjusted),
}

impl WarehouseEvent {
    pub fn key(&self) -> StockKey {
        match self {
            WarehouseEvent::ItemOpened(e) => e.key,
            WarehouseEvent::UnitsAdjusted(e) => e.key,
        }
    }
}

impl Event for WarehouseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WarehouseEvent::ItemOpened(_) => "warehouse.item.opened",
            WarehouseEvent::UnitsAdjusted(_) => "warehouse.item.units_adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WarehouseEvent::ItemOpened(e) => e.occurred_at,
            WarehouseEvent::UnitsAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for WarehouseItem {
    type Command = WarehouseCommand;
    type Event = WarehouseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WarehouseEvent::ItemOpened(e) => {
                self.key = e.key;
                self.total_units = 0;
                self.created = true;
            }
            WarehouseEvent::UnitsAdjusted(e) => {
                self.total_units = e.total_after;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if command.key() != self.key {
            return Err(DomainError::precondition("stock key mismatch"));
        }
        match command {
            WarehouseCommand::EnsureItem(cmd) => Ok(self.handle_ensure(cmd)),
            WarehouseCommand::AdjustUnits(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl WarehouseItem {
    fn handle_ensure(&self, cmd: &EnsureItem) -> Vec<WarehouseEvent> {
        if self.created {
            return vec![];
        }
        vec![WarehouseEvent::ItemOpened(ItemOpened {
            key: cmd.key,
            occurred_at: cmd.occurred_at,
        })]
    }

    fn handle_adjust(&self, cmd: &AdjustUnits) -> Result<Vec<WarehouseEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("warehouse item {}", self.key)));
        }
        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        // Over-draws clamp at zero instead of failing.
        let total_after = i64::from(self.total_units)
            .saturating_add(cmd.delta)
            .clamp(0, i64::from(u32::MAX));
        let total_after = u32::try_from(total_after).unwrap_or(u32::MAX);

        Ok(vec![WarehouseEvent::UnitsAdjusted(UnitsAdjusted {
            key: cmd.key,
            delta: cmd.delta,
            total_after,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receiptdesk_events::execute;

    fn opened(t: ReceiptType) -> WarehouseItem {
        let key = StockKey::new(UserId::new(), t);
        let mut item = WarehouseItem::empty(key);
        execute(
            &mut item,
            &WarehouseCommand::EnsureItem(EnsureItem {
                key,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        item
    }

    fn adjust(item: &mut WarehouseItem, delta: i64) -> Result<Vec<WarehouseEvent>, DomainError> {
        let key = item.key();
        execute(
            item,
            &WarehouseCommand::AdjustUnits(AdjustUnits {
                key,
                delta,
                occurred_at: Utc::now(),
            }),
        )
    }

    #[test]
    fn ensure_opens_once_with_zero_units() {
        let mut item = opened(ReceiptType::DeliveryReceipt);
        assert_eq!(item.total_units(), 0);
        assert_eq!(item.receipts_per_unit(), 50);
        assert_eq!(item.unit_label(), UnitLabel::Booklet);

        let key = item.key();
        let events = execute(
            &mut item,
            &WarehouseCommand::EnsureItem(EnsureItem {
                key,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert!(events.is_empty());
        assert_eq!(item.version(), 1);
    }

    #[test]
    fn adjust_moves_units_both_ways() {
        let mut item = opened(ReceiptType::SalesInvoice);
        adjust(&mut item, 15).unwrap();
        adjust(&mut item, -5).unwrap();
        assert_eq!(item.total_units(), 10);
        assert_eq!(item.unit_label(), UnitLabel::Box);
    }

    #[test]
    fn overdraw_clamps_at_zero() {
        let mut item = opened(ReceiptType::SalesInvoice);
        adjust(&mut item, 3).unwrap();
        adjust(&mut item, -10).unwrap();
        assert_eq!(item.total_units(), 0);
    }

    #[test]
    fn extreme_deltas_saturate_instead_of_wrapping() {
        let mut item = opened(ReceiptType::SalesInvoice);
        adjust(&mut item, 15).unwrap();

        adjust(&mut item, i64::MAX).unwrap();
        assert_eq!(item.total_units(), u32::MAX);

        adjust(&mut item, i64::MIN).unwrap();
        assert_eq!(item.total_units(), 0);
    }

    #[test]
    fn adjust_unopened_item_is_not_found() {
        let key = StockKey::new(UserId::new(), ReceiptType::ServiceInvoice);
        let mut item = WarehouseItem::empty(key);
        assert!(matches!(adjust(&mut item, 5), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn zero_delta_is_rejected() {
        let mut item = opened(ReceiptType::CollectionReceipt);
        assert!(matches!(adjust(&mut item, 0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn record_derives_unit_metadata_from_type() {
        let mut item = opened(ReceiptType::SalesInvoice);
        adjust(&mut item, 15).unwrap();

        let record = item.to_record();
        assert_eq!(record.receipts_per_unit, 500);
        assert_eq!(record.unit_label, UnitLabel::Box);

        let rebuilt = WarehouseItem::from_record(WarehouseRecord {
            receipts_per_unit: 7,
            ..record
        });
        assert_eq!(rebuilt.receipts_per_unit(), 500);
        assert_eq!(rebuilt.total_units(), 15);
    }
}
