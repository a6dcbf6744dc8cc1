use std::collections::BTreeMap;

use receiptdesk_core::{Aggregate, DomainError, DomainResult, UserId};
use receiptdesk_receipts::StockKey;

use crate::order::{ReceiptOrder, ReceiptOrderCommand, ReceiptOrderEvent, ReceiptOrderId};

/// All receipt orders, keyed by id (ids are time-ordered).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    orders: BTreeMap<ReceiptOrderId, ReceiptOrder>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ReceiptOrderId) -> Option<&ReceiptOrder> {
        self.orders.get(&id)
    }

    pub fn require(&self, id: ReceiptOrderId) -> DomainResult<&ReceiptOrder> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))
    }

    /// Orders newest first, optionally for one branch.
    pub fn list(&self, branch: Option<UserId>) -> Vec<&ReceiptOrder> {
        self.orders
            .values()
            .rev()
            .filter(|o| branch.is_none_or(|b| o.branch_id() == b))
            .collect()
    }

    /// Highest series end among orders already shipped for `key`.
    pub fn shipped_series_end(&self, key: &StockKey) -> Option<u64> {
        self.orders
            .values()
            .filter(|o| o.stock_key() == *key && o.status().is_shipped())
            .filter_map(|o| o.series().map(|r| r.end))
            .max()
    }

    /// Decide against an existing order; unknown ids are `NotFound`.
    pub fn decide(
        &self,
        id: ReceiptOrderId,
        command: &ReceiptOrderCommand,
    ) -> DomainResult<Vec<ReceiptOrderEvent>> {
        self.require(id)?.handle(command)
    }

    /// Decide the creation of a new order.
    pub fn decide_new(
        &self,
        id: ReceiptOrderId,
        command: &ReceiptOrderCommand,
    ) -> DomainResult<Vec<ReceiptOrderEvent>> {
        if self.orders.contains_key(&id) {
            return Err(DomainError::conflict(format!("order {id} already exists")));
        }
        ReceiptOrder::empty(id).handle(command)
    }

    pub fn apply(&mut self, events: &[ReceiptOrderEvent]) {
        for ev in events {
            let id = ev.order_id();
            self.orders
                .entry(id)
                .or_insert_with(|| ReceiptOrder::empty(id))
                .apply(ev);
        }
    }

    pub fn remove_branch(&mut self, branch: UserId) -> usize {
        let before = self.orders.len();
        self.orders.retain(|_, o| o.branch_id() != branch);
        before - self.orders.len()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn replace_all(&mut self, orders: impl IntoIterator<Item = ReceiptOrder>) {
        self.orders = orders.into_iter().map(|o| (o.id_typed(), o)).collect();
    }
}
