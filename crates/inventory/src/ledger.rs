use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use receiptdesk_core::{Aggregate, DomainError, DomainResult, UserId};
use receiptdesk_receipts::{SeriesRange, StockKey};

use crate::entry::{
    ChangeCompany, CreditDelivery, InventoryCommand, InventoryEntry, InventoryEvent, LogConsumption,
};

/// Per-branch receipt inventory, one entry per (branch, type).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryLedger {
    entries: BTreeMap<StockKey, InventoryEntry>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &StockKey) -> Option<&InventoryEntry> {
        self.entries.get(key)
    }

    /// Entries for one branch, or every entry when `branch` is `None`.
    pub fn list(&self, branch: Option<UserId>) -> Vec<&InventoryEntry> {
        self.entries
            .values()
            .filter(|e| branch.is_none_or(|b| e.branch_id() == b))
            .collect()
    }

    /// Entries at or below their low-stock threshold.
    pub fn low_stock(&self, branch: Option<UserId>) -> Vec<&InventoryEntry> {
        self.list(branch)
            .into_iter()
            .filter(|e| e.is_low_stock())
            .collect()
    }

    /// Highest series number handed to this branch/type so far.
    pub fn current_series_end(&self, key: &StockKey) -> Option<u64> {
        self.entries.get(key).map(InventoryEntry::current_series_end)
    }

    /// Decide a command against the entry it targets without mutating anything.
    ///
    /// Commands for a key with no entry yet run against an empty entry.
    pub fn decide(&self, command: &InventoryCommand) -> DomainResult<Vec<InventoryEvent>> {
        let key = command.key();
        match self.entries.get(&key) {
            Some(entry) => entry.handle(command),
            None => InventoryEntry::empty(key).handle(command),
        }
    }

    /// Apply previously decided events.
    pub fn apply(&mut self, events: &[InventoryEvent]) {
        for ev in events {
            let key = ev.key();
            self.entries
                .entry(key)
                .or_insert_with(|| InventoryEntry::empty(key))
                .apply(ev);
        }
    }

    fn execute(&mut self, command: &InventoryCommand) -> DomainResult<Vec<InventoryEvent>> {
        let events = self.decide(command)?;
        self.apply(&events);
        Ok(events)
    }

    /// Record the last receipt number a branch has used.
    pub fn consume(
        &mut self,
        key: StockKey,
        new_last_used: u64,
        date: NaiveDate,
        logged_by: &str,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<InventoryEvent>> {
        if !self.entries.contains_key(&key) {
            return Err(DomainError::not_found(format!("inventory entry {key}")));
        }
        self.execute(&InventoryCommand::LogConsumption(LogConsumption {
            key,
            new_last_used,
            date,
            logged_by: logged_by.to_string(),
            occurred_at,
        }))
    }

    /// Credit a received delivery, opening the entry if needed.
    pub fn credit_delivery(
        &mut self,
        key: StockKey,
        company: &str,
        range: SeriesRange,
        total_receipts: u64,
        delivered_on: NaiveDate,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<InventoryEvent>> {
        self.execute(&InventoryCommand::CreditDelivery(CreditDelivery {
            key,
            company: company.to_string(),
            range,
            total_receipts,
            delivered_on,
            occurred_at,
        }))
    }

    /// Commands re-labelling every entry of `branch` with `company`.
    pub fn company_change_commands(
        &self,
        branch: UserId,
        company: &str,
        occurred_at: DateTime<Utc>,
    ) -> Vec<InventoryCommand> {
        self.list(Some(branch))
            .into_iter()
            .filter(|e| e.company() != company)
            .map(|e| {
                InventoryCommand::ChangeCompany(ChangeCompany {
                    key: e.key(),
                    company: company.to_string(),
                    occurred_at,
                })
            })
            .collect()
    }

    /// Drop every entry of `branch`; returns how many were removed.
    pub fn remove_branch(&mut self, branch: UserId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.branch_id != branch);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = InventoryEntry>) {
        self.entries = entries.into_iter().map(|e| (e.key(), e)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use receiptdesk_receipts::ReceiptType;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 10, 25).unwrap()
    }

    fn opened(ledger: &mut InventoryLedger, key: StockKey, start: u64, end: u64) {
        ledger
            .credit_delivery(
                key,
                "PMCI",
                SeriesRange { start, end },
                end + 1 - start,
                today(),
                Utc::now(),
            )
            .unwrap();
    }

    #[test]
    fn consume_on_missing_entry_is_not_found() {
        let mut ledger = InventoryLedger::new();
        let key = StockKey::new(UserId::new(), ReceiptType::SalesInvoice);
        let err = ledger
            .consume(key, 10, today(), "Ana", Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn list_and_low_stock_filter_by_branch() {
        let mut ledger = InventoryLedger::new();
        let manila = UserId::new();
        let cebu = UserId::new();
        opened(&mut ledger, StockKey::new(manila, ReceiptType::SalesInvoice), 1_000, 7_499);
        opened(&mut ledger, StockKey::new(cebu, ReceiptType::CollectionReceipt), 1, 200);

        assert_eq!(ledger.list(Some(manila)).len(), 1);
        assert_eq!(ledger.list(None).len(), 2);

        let low: Vec<StockKey> = ledger.low_stock(None).iter().map(|e| e.key()).collect();
        assert_eq!(low, vec![StockKey::new(cebu, ReceiptType::CollectionReceipt)]);
    }

    #[test]
    fn company_change_targets_only_stale_entries_of_the_branch() {
        let mut ledger = InventoryLedger::new();
        let manila = UserId::new();
        let other = UserId::new();
        opened(&mut ledger, StockKey::new(manila, ReceiptType::SalesInvoice), 1, 500);
        opened(&mut ledger, StockKey::new(manila, ReceiptType::DeliveryReceipt), 1, 50);
        opened(&mut ledger, StockKey::new(other, ReceiptType::SalesInvoice), 1, 500);

        let commands = ledger.company_change_commands(manila, "PEHI", Utc::now());
        assert_eq!(commands.len(), 2);
        for cmd in &commands {
            let events = ledger.decide(cmd).unwrap();
            ledger.apply(&events);
        }

        assert!(ledger.list(Some(manila)).iter().all(|e| e.company() == "PEHI"));
        assert_eq!(ledger.list(Some(other))[0].company(), "PMCI");
        assert!(ledger.company_change_commands(manila, "PEHI", Utc::now()).is_empty());
    }

    #[test]
    fn remove_branch_drops_only_that_branch() {
        let mut ledger = InventoryLedger::new();
        let manila = UserId::new();
        let cebu = UserId::new();
        opened(&mut ledger, StockKey::new(manila, ReceiptType::SalesInvoice), 1, 500);
        opened(&mut ledger, StockKey::new(manila, ReceiptType::ServiceInvoice), 1, 50);
        opened(&mut ledger, StockKey::new(cebu, ReceiptType::SalesInvoice), 1, 500);

        assert_eq!(ledger.remove_branch(manila), 2);
        assert_eq!(ledger.len(), 1);
    }

    proptest! {
        /// Property: remaining stock equals delivered minus consumed whenever
        /// consumption stays inside the series.
        #[test]
        fn remaining_tracks_deliveries_minus_consumption(
            deliveries in prop::collection::vec(1u64..20, 1..5),
            steps in prop::collection::vec(1u64..40, 0..20),
        ) {
            let mut ledger = InventoryLedger::new();
            let key = StockKey::new(UserId::new(), ReceiptType::DeliveryReceipt);

            let mut end = 0;
            let mut delivered = 0;
            for booklets in deliveries {
                let receipts = booklets * 50;
                let range = SeriesRange { start: end + 1, end: end + receipts };
                ledger.credit_delivery(key, "PMCI", range, receipts, today(), Utc::now()).unwrap();
                end = range.end;
                delivered += receipts;
            }

            let mut last = 0;
            for step in steps {
                if last + step > end {
                    break;
                }
                last += step;
                ledger.consume(key, last, today(), "Ana", Utc::now()).unwrap();
            }

            let entry = ledger.get(&key).unwrap();
            prop_assert_eq!(entry.remaining_stock(), delivered - last);
            prop_assert_eq!(entry.current_series_end(), end);
            prop_assert!(entry.position().is_consistent());
        }
    }
}
