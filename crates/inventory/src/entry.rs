use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use receiptdesk_core::{Aggregate, AggregateRoot, DomainError, UserId};
use receiptdesk_events::Event;
use receiptdesk_receipts::{
    ReceiptType, SeriesPosition, SeriesRange, StockKey, apply_consumption, is_low_stock,
    threshold_for,
};

/// Aggregate root: InventoryEntry (one per branch x receipt type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    key: StockKey,
    company: String,
    position: SeriesPosition,
    threshold: u64,
    last_update_date: Option<NaiveDate>,
    last_updated_by: Option<String>,
    version: u64,
    created: bool,
}

impl InventoryEntry {
    /// Create an empty, not-yet-opened entry for `key`.
    pub fn empty(key: StockKey) -> Self {
        Self {
            key,
            company: String::new(),
            position: SeriesPosition {
                series_start: 0,
                series_end: 0,
                last_used: 0,
                remaining: 0,
            },
            threshold: threshold_for(key.receipt_type),
            last_update_date: None,
            last_updated_by: None,
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

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn position(&self) -> &SeriesPosition {
        &self.position
    }

    pub fn current_series_start(&self) -> u64 {
        self.position.series_start
    }

    pub fn current_series_end(&self) -> u64 {
        self.position.series_end
    }

    pub fn last_used_number(&self) -> u64 {
        self.position.last_used
    }

    pub fn remaining_stock(&self) -> u64 {
        self.position.remaining
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn last_update_date(&self) -> Option<NaiveDate> {
        self.last_update_date
    }

    pub fn last_updated_by(&self) -> Option<&str> {
        self.last_updated_by.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Derived: remaining stock at or below the threshold.
    pub fn is_low_stock(&self) -> bool {
        is_low_stock(self.position.remaining, self.threshold)
    }

    pub fn to_record(&self) -> InventoryRecord {
        InventoryRecord {
            branch_id: self.key.branch_id,
            company: self.company.clone(),
            receipt_type: self.key.receipt_type,
            current_series_start: self.position.series_start,
            current_series_end: self.position.series_end,
            last_used_number: self.position.last_used,
            remaining_stock: self.position.remaining,
            threshold: self.threshold,
            last_update_date: self.last_update_date,
            last_updated_by: self.last_updated_by.clone(),
        }
    }

    /// Rebuild an entry from a plain record (remote import or seed data).
    ///
    /// Only the series invariant is checked; counters are taken as given.
    pub fn from_record(record: InventoryRecord) -> Result<Self, DomainError> {
        let position = SeriesPosition {
            series_start: record.current_series_start,
            series_end: record.current_series_end,
            last_used: record.last_used_number,
            remaining: record.remaining_stock,
        };
        if !position.is_consistent() {
            return Err(DomainError::validation(format!(
                "last used number {} outside series {}..={}",
                position.last_used, position.series_start, position.series_end
            )));
        }

        Ok(Self {
            key: StockKey::new(record.branch_id, record.receipt_type),
            company: record.company,
            position,
            threshold: record.threshold,
            last_update_date: record.last_update_date,
            last_updated_by: record.last_updated_by,
            version: 0,
            created: true,
        })
    }
}

impl AggregateRoot for InventoryEntry {
    type Id = StockKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Plain, flat inventory record (export/import shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub branch_id: UserId,
    pub company: String,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub current_series_start: u64,
    pub current_series_end: u64,
    pub last_used_number: u64,
    pub remaining_stock: u64,
    pub threshold: u64,
    pub last_update_date: Option<NaiveDate>,
    pub last_updated_by: Option<String>,
}

/// Command: CreditDelivery (a received shipment lands on the branch shelf).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDelivery {
    pub key: StockKey,
    pub company: String,
    pub range: SeriesRange,
    pub total_receipts: u64,
    pub delivered_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: LogConsumption (branch staff report the last number used).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConsumption {
    pub key: StockKey,
    pub new_last_used: u64,
    pub date: NaiveDate,
    pub logged_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeCompany (branch company edited by the admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCompany {
    pub key: StockKey,
    pub company: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreditDelivery(CreditDelivery),
    LogConsumption(LogConsumption),
    ChangeCompany(ChangeCompany),
}

impl InventoryCommand {
    pub fn key(&self) -> StockKey {
        match self {
            InventoryCommand::CreditDelivery(c) => c.key,
            InventoryCommand::LogConsumption(c) => c.key,
            InventoryCommand::ChangeCompany(c) => c.key,
        }
    }
}

/// Event: SeriesOpened (first delivery for a branch/type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesOpened {
    pub key: StockKey,
    pub company: String,
    pub range: SeriesRange,
    pub total_receipts: u64,
    pub threshold: u64,
    pub delivered_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryCredited (later deliveries extend the open series).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCredited {
    pub key: StockKey,
    pub range: SeriesRange,
    pub total_receipts: u64,
    pub new_series_end: u64,
    pub threshold: u64,
    pub delivered_on: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ConsumptionLogged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionLogged {
    pub key: StockKey,
    pub previous_last_used: u64,
    pub new_last_used: u64,
    pub remaining_after: u64,
    pub date: NaiveDate,
    pub logged_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CompanyChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyChanged {
    pub key: StockKey,
    pub company: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    SeriesOpened(SeriesOpened),
    DeliveryCredited(DeliveryCredited),
    ConsumptionLogged(ConsumptionLogged),
    CompanyChanged(CompanyChanged),
}

impl InventoryEvent {
    pub fn key(&self) -> StockKey {
        match self {
            InventoryEvent::SeriesOpened(e) => e.key,
            InventoryEvent::DeliveryCredited(e) => e.key,
            InventoryEvent::ConsumptionLogged(e) => e.key,
            InventoryEvent::CompanyChanged(e) => e.key,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::SeriesOpened(_) => "inventory.entry.series_opened",
            InventoryEvent::DeliveryCredited(_) => "inventory.entry.delivery_credited",
            InventoryEvent::ConsumptionLogged(_) => "inventory.entry.consumption_logged",
            InventoryEvent::CompanyChanged(_) => "inventory.entry.company_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::SeriesOpened(e) => e.occurred_at,
            InventoryEvent::DeliveryCredited(e) => e.occurred_at,
            InventoryEvent::ConsumptionLogged(e) => e.occurred_at,
            InventoryEvent::CompanyChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryEntry {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::SeriesOpened(e) => {
                self.key = e.key;
                self.company = e.company.clone();
                self.position = SeriesPosition::opened(e.range, e.total_receipts);
                self.threshold = e.threshold;
                self.last_update_date = Some(e.delivered_on);
                self.created = true;
            }
            InventoryEvent::DeliveryCredited(e) => {
                self.position.remaining += e.total_receipts;
                self.position.series_end = e.new_series_end;
                self.threshold = e.threshold;
                self.last_update_date = Some(e.delivered_on);
            }
            InventoryEvent::ConsumptionLogged(e) => {
                self.position.last_used = e.new_last_used;
                self.position.remaining = e.remaining_after;
                self.last_update_date = Some(e.date);
                self.last_updated_by = Some(e.logged_by.clone());
            }
            InventoryEvent::CompanyChanged(e) => {
                self.company = e.company.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if command.key() != self.key {
            return Err(DomainError::precondition("stock key mismatch"));
        }
        match command {
            InventoryCommand::CreditDelivery(cmd) => self.handle_credit(cmd),
            InventoryCommand::LogConsumption(cmd) => self.handle_consumption(cmd),
            InventoryCommand::ChangeCompany(cmd) => self.handle_company(cmd),
        }
    }
}

impl InventoryEntry {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("inventory entry {}", self.key)));
        }
        Ok(())
    }

    fn handle_credit(&self, cmd: &CreditDelivery) -> Result<Vec<InventoryEvent>, DomainError> {
        if cmd.total_receipts == 0 {
            return Err(DomainError::validation("delivery must contain receipts"));
        }
        if cmd.range.is_empty() || cmd.range.len() != cmd.total_receipts {
            return Err(DomainError::validation(format!(
                "series {}..={} does not hold {} receipts",
                cmd.range.start, cmd.range.end, cmd.total_receipts
            )));
        }

        let threshold = threshold_for(cmd.key.receipt_type);

        if !self.created {
            return Ok(vec![InventoryEvent::SeriesOpened(SeriesOpened {
                key: cmd.key,
                company: cmd.company.clone(),
                range: cmd.range,
                total_receipts: cmd.total_receipts,
                threshold,
                delivered_on: cmd.delivered_on,
                occurred_at: cmd.occurred_at,
            })]);
        }

        Ok(vec![InventoryEvent::DeliveryCredited(DeliveryCredited {
            key: cmd.key,
            range: cmd.range,
            total_receipts: cmd.total_receipts,
            new_series_end: self.position.series_end.max(cmd.range.end),
            threshold,
            delivered_on: cmd.delivered_on,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_consumption(&self, cmd: &LogConsumption) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created()?;

        let logged_by = cmd.logged_by.trim();
        if logged_by.is_empty() {
            return Err(DomainError::validation("logged by cannot be empty"));
        }

        let next = apply_consumption(&self.position, cmd.new_last_used)?;

        Ok(vec![InventoryEvent::ConsumptionLogged(ConsumptionLogged {
            key: cmd.key,
            previous_last_used: self.position.last_used,
            new_last_used: next.last_used,
            remaining_after: next.remaining,
            date: cmd.date,
            logged_by: logged_by.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_company(&self, cmd: &ChangeCompany) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created()?;

        if cmd.company.trim().is_empty() {
            return Err(DomainError::validation("company cannot be empty"));
        }
        if cmd.company == self.company {
            return Ok(vec![]);
        }

        Ok(vec![InventoryEvent::CompanyChanged(CompanyChanged {
            key: cmd.key,
            company: cmd.company.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receiptdesk_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 10, 25).unwrap()
    }

    fn key(t: ReceiptType) -> StockKey {
        StockKey::new(UserId::new(), t)
    }

    fn credit(key: StockKey, start: u64, end: u64) -> InventoryCommand {
        InventoryCommand::CreditDelivery(CreditDelivery {
            key,
            company: "PMCI".to_string(),
            range: SeriesRange { start, end },
            total_receipts: end + 1 - start,
            delivered_on: test_date(),
            occurred_at: test_time(),
        })
    }

    fn consume(key: StockKey, new_last_used: u64) -> InventoryCommand {
        InventoryCommand::LogConsumption(LogConsumption {
            key,
            new_last_used,
            date: test_date(),
            logged_by: "Ana".to_string(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn first_delivery_opens_series_with_nothing_used() {
        let key = key(ReceiptType::SalesInvoice);
        let mut entry = InventoryEntry::empty(key);

        let events = execute(&mut entry, &credit(key, 5_001, 7_500)).unwrap();
        assert!(matches!(events[0], InventoryEvent::SeriesOpened(_)));

        assert_eq!(entry.current_series_start(), 5_001);
        assert_eq!(entry.current_series_end(), 7_500);
        assert_eq!(entry.last_used_number(), 5_000);
        assert_eq!(entry.remaining_stock(), 2_500);
        assert_eq!(entry.threshold(), 5_000);
        assert!(entry.is_low_stock());
    }

    #[test]
    fn later_delivery_adds_stock_and_raises_series_end() {
        let key = key(ReceiptType::CollectionReceipt);
        let mut entry = InventoryEntry::empty(key);
        execute(&mut entry, &credit(key, 1, 100)).unwrap();
        execute(&mut entry, &consume(key, 60)).unwrap();

        execute(&mut entry, &credit(key, 101, 300)).unwrap();

        assert_eq!(entry.current_series_start(), 1);
        assert_eq!(entry.current_series_end(), 300);
        assert_eq!(entry.last_used_number(), 60);
        assert_eq!(entry.remaining_stock(), 40 + 200);
        assert!(entry.is_low_stock());
    }

    #[test]
    fn consumption_records_who_and_when() {
        let key = key(ReceiptType::ServiceInvoice);
        let mut entry = InventoryEntry::empty(key);
        execute(&mut entry, &credit(key, 20_000, 25_000 - 1)).unwrap();

        execute(&mut entry, &consume(key, 20_100)).unwrap();

        assert_eq!(entry.last_used_number(), 20_100);
        assert_eq!(entry.remaining_stock(), 5_000 - 101);
        assert_eq!(entry.last_updated_by(), Some("Ana"));
        assert_eq!(entry.last_update_date(), Some(test_date()));
    }

    #[test]
    fn out_of_range_consumption_is_rejected_without_change() {
        let key = key(ReceiptType::DeliveryReceipt);
        let mut entry = InventoryEntry::empty(key);
        execute(&mut entry, &credit(key, 1, 50)).unwrap();
        let before = entry.clone();

        assert!(matches!(entry.handle(&consume(key, 0)), Err(DomainError::Validation(_))));
        assert!(matches!(entry.handle(&consume(key, 51)), Err(DomainError::Validation(_))));
        assert_eq!(entry, before);
    }

    #[test]
    fn consumption_on_unopened_entry_is_not_found() {
        let key = key(ReceiptType::SalesInvoice);
        let entry = InventoryEntry::empty(key);
        assert!(matches!(entry.handle(&consume(key, 10)), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn blank_logged_by_is_rejected() {
        let key = key(ReceiptType::SalesInvoice);
        let mut entry = InventoryEntry::empty(key);
        execute(&mut entry, &credit(key, 1, 500)).unwrap();

        let cmd = InventoryCommand::LogConsumption(LogConsumption {
            key,
            new_last_used: 10,
            date: test_date(),
            logged_by: "  ".to_string(),
            occurred_at: test_time(),
        });
        assert!(matches!(entry.handle(&cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn credit_with_mismatched_range_is_rejected() {
        let key = key(ReceiptType::SalesInvoice);
        let entry = InventoryEntry::empty(key);
        let cmd = InventoryCommand::CreditDelivery(CreditDelivery {
            key,
            company: "PMCI".to_string(),
            range: SeriesRange { start: 1, end: 500 },
            total_receipts: 1_000,
            delivered_on: test_date(),
            occurred_at: test_time(),
        });
        assert!(matches!(entry.handle(&cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn record_with_last_used_outside_series_is_rejected() {
        let record = InventoryRecord {
            branch_id: UserId::new(),
            company: "PMCI".to_string(),
            receipt_type: ReceiptType::SalesInvoice,
            current_series_start: 1_000,
            current_series_end: 5_000,
            last_used_number: 5_001,
            remaining_stock: 0,
            threshold: 5_000,
            last_update_date: None,
            last_updated_by: None,
        };
        assert!(InventoryEntry::from_record(record).is_err());
    }
}
