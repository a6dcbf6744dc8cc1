use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use receiptdesk_core::{Aggregate, DomainResult, UserId};
use receiptdesk_receipts::StockKey;

use crate::item::{AdjustUnits, EnsureItem, WarehouseCommand, WarehouseEvent, WarehouseItem};

/// Warehouse allocations for every branch.
///
/// The `plan_*` methods decide without mutating; `apply` commits. The
/// convenience methods do both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarehouseStore {
    items: BTreeMap<StockKey, WarehouseItem>,
}

impl WarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items held for one branch.
    pub fn get(&self, branch: UserId) -> Vec<&WarehouseItem> {
        self.items
            .values()
            .filter(|i| i.branch_id() == branch)
            .collect()
    }

    pub fn item(&self, key: &StockKey) -> Option<&WarehouseItem> {
        self.items.get(key)
    }

    pub fn all(&self) -> impl Iterator<Item = &WarehouseItem> {
        self.items.values()
    }

    /// Units on hand, `None` when the item was never created.
    pub fn available(&self, key: &StockKey) -> Option<u32> {
        self.items.get(key).map(WarehouseItem::total_units)
    }

    fn current(&self, key: StockKey) -> WarehouseItem {
        self.items
            .get(&key)
            .cloned()
            .unwrap_or_else(|| WarehouseItem::empty(key))
    }

    pub fn plan_ensure(
        &self,
        key: StockKey,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<WarehouseEvent>> {
        self.current(key)
            .handle(&WarehouseCommand::EnsureItem(EnsureItem { key, occurred_at }))
    }

    pub fn plan_adjust(
        &self,
        key: StockKey,
        delta: i64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<WarehouseEvent>> {
        self.current(key)
            .handle(&WarehouseCommand::AdjustUnits(AdjustUnits {
                key,
                delta,
                occurred_at,
            }))
    }

    /// Ensure followed by a positive adjustment, decided as one unit.
    pub fn plan_replenish(
        &self,
        key: StockKey,
        units: u32,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<WarehouseEvent>> {
        let mut scratch = self.current(key);
        let mut events = self.plan_ensure(key, occurred_at)?;
        for ev in &events {
            scratch.apply(ev);
        }
        events.extend(scratch.handle(&WarehouseCommand::AdjustUnits(AdjustUnits {
            key,
            delta: i64::from(units),
            occurred_at,
        }))?);
        Ok(events)
    }

    pub fn apply(&mut self, events: &[WarehouseEvent]) {
        for ev in events {
            let key = ev.key();
            self.items
                .entry(key)
                .or_insert_with(|| WarehouseItem::empty(key))
                .apply(ev);
        }
    }

    pub fn ensure(
        &mut self,
        key: StockKey,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<WarehouseEvent>> {
        let events = self.plan_ensure(key, occurred_at)?;
        self.apply(&events);
        Ok(events)
    }

    pub fn adjust(
        &mut self,
        key: StockKey,
        delta: i64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<WarehouseEvent>> {
        let events = self.plan_adjust(key, delta, occurred_at)?;
        self.apply(&events);
        Ok(events)
    }

    pub fn replenish(
        &mut self,
        key: StockKey,
        units: u32,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<WarehouseEvent>> {
        let events = self.plan_replenish(key, units, occurred_at)?;
        self.apply(&events);
        Ok(events)
    }

    pub fn remove_branch(&mut self, branch: UserId) -> usize {
        let before = self.items.len();
        self.items.retain(|key, _| key.branch_id != branch);
        before - self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn replace_all(&mut self, items: impl IntoIterator<Item = WarehouseItem>) {
        self.items = items.into_iter().map(|i| (i.key(), i)).collect();
    }
}
