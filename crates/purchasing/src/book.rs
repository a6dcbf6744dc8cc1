use std::collections::BTreeMap;

use serde::Serialize;

use receiptdesk_core::{Aggregate, DomainError, DomainResult, UserId};

use crate::order::{
    SupplierOrder, SupplierOrderCommand, SupplierOrderEvent, SupplierOrderId, SupplierOrderStatus,
};

/// Totals over delivered supplier orders, in centavos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BillingSummary {
    pub invoice_count: usize,
    pub total_paid: u64,
    pub total_outstanding: u64,
}

/// All supplier orders, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierOrderBook {
    orders: BTreeMap<SupplierOrderId, SupplierOrder>,
}

impl SupplierOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SupplierOrderId) -> Option<&SupplierOrder> {
        self.orders.get(&id)
    }

    pub fn require(&self, id: SupplierOrderId) -> DomainResult<&SupplierOrder> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found(format!("supplier order {id}")))
    }

    /// Newest first.
    pub fn list(&self) -> Vec<&SupplierOrder> {
        self.orders.values().rev().collect()
    }

    /// Delivered orders matching `query` against branch name, invoice number
    /// or PRF number (case-insensitive substring). An empty query matches all.
    pub fn billing_archive<'n, F>(&self, query: Option<&str>, branch_name: F) -> Vec<&SupplierOrder>
    where
        F: Fn(UserId) -> Option<&'n str>,
    {
        let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
        let contains = |hay: Option<&str>| hay.is_some_and(|h| h.to_lowercase().contains(&needle));

        self.list()
            .into_iter()
            .filter(|o| o.status() == SupplierOrderStatus::Delivered)
            .filter(|o| {
                needle.is_empty()
                    || contains(branch_name(o.branch_id()))
                    || contains(o.billing().map(|b| b.billing_invoice_no.as_str()))
                    || contains(o.prf_number())
            })
            .collect()
    }

    pub fn billing_summary<'n, F>(&self, query: Option<&str>, branch_name: F) -> BillingSummary
    where
        F: Fn(UserId) -> Option<&'n str>,
    {
        self.billing_archive(query, branch_name)
            .into_iter()
            .fold(BillingSummary::default(), |mut acc, o| {
                let amount = o.billing().map_or(0, |b| b.amount);
                acc.invoice_count += 1;
                if o.is_paid() {
                    acc.total_paid = acc.total_paid.saturating_add(amount);
                } else {
                    acc.total_outstanding = acc.total_outstanding.saturating_add(amount);
                }
                acc
            })
    }

    pub fn decide(
        &self,
        id: SupplierOrderId,
        command: &SupplierOrderCommand,
    ) -> DomainResult<Vec<SupplierOrderEvent>> {
        self.require(id)?.handle(command)
    }

    pub fn decide_new(
        &self,
        id: SupplierOrderId,
        command: &SupplierOrderCommand,
    ) -> DomainResult<Vec<SupplierOrderEvent>> {
        if self.orders.contains_key(&id) {
            return Err(DomainError::conflict(format!("supplier order {id} already exists")));
        }
        SupplierOrder::empty(id).handle(command)
    }

    pub fn apply(&mut self, events: &[SupplierOrderEvent]) {
        for ev in events {
            let id = ev.order_id();
            self.orders
                .entry(id)
                .or_insert_with(|| SupplierOrder::empty(id))
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

    pub fn replace_all(&mut self, orders: impl IntoIterator<Item = SupplierOrder>) {
        self.orders = orders.into_iter().map(|o| (o.id_typed(), o)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use receiptdesk_receipts::ReceiptType;

    use crate::order::{AttachPrf, Billing, ConfirmDelivery, MarkShipped, RequestSupply, SetPaid};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 2).unwrap()
    }

    fn run(book: &mut SupplierOrderBook, id: SupplierOrderId, cmd: SupplierOrderCommand) {
        let events = book.decide(id, &cmd).unwrap();
        book.apply(&events);
    }

    fn delivered(book: &mut SupplierOrderBook, branch: UserId, invoice: &str, amount: u64) -> SupplierOrderId {
        let id = SupplierOrderId::new();
        let events = book
            .decide_new(
                id,
                &SupplierOrderCommand::RequestSupply(RequestSupply {
                    order_id: id,
                    branch_id: branch,
                    receipt_type: ReceiptType::SalesInvoice,
                    quantity_units: 4,
                    request_date: date(),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        book.apply(&events);
        run(book, id, SupplierOrderCommand::MarkShipped(MarkShipped { order_id: id, occurred_at: Utc::now() }));
        run(
            book,
            id,
            SupplierOrderCommand::ConfirmDelivery(ConfirmDelivery {
                order_id: id,
                billing: Billing {
                    billing_invoice_no: invoice.to_string(),
                    amount,
                    delivery_receipt_no: "DR-1".to_string(),
                    delivery_date: date(),
                },
                occurred_at: Utc::now(),
            }),
        );
        id
    }

    #[test]
    fn summary_splits_paid_and_outstanding() {
        let mut book = SupplierOrderBook::new();
        let cebu = UserId::new();
        let davao = UserId::new();

        let paid = delivered(&mut book, cebu, "INV-100", 50_000);
        run(&mut book, paid, SupplierOrderCommand::SetPaid(SetPaid { order_id: paid, paid: true, occurred_at: Utc::now() }));
        let prf = delivered(&mut book, davao, "INV-200", 20_000);
        run(
            &mut book,
            prf,
            SupplierOrderCommand::AttachPrf(AttachPrf {
                order_id: prf,
                prf_number: "PRF-2023-0007".to_string(),
                occurred_at: Utc::now(),
            }),
        );

        let names = move |id: UserId| {
            if id == cebu {
                Some("Seaside Cebu")
            } else if id == davao {
                Some("SM Davao")
            } else {
                None
            }
        };

        let all = book.billing_summary(None, names);
        assert_eq!(
            all,
            BillingSummary {
                invoice_count: 2,
                total_paid: 50_000,
                total_outstanding: 20_000,
            }
        );

        assert_eq!(book.billing_summary(Some("cebu"), names).invoice_count, 1);
        assert_eq!(book.billing_summary(Some("prf-2023"), names).total_outstanding, 20_000);
        assert_eq!(book.billing_summary(Some("inv-1"), names).total_paid, 50_000);
        assert_eq!(book.billing_summary(Some("nowhere"), names), BillingSummary::default());
    }

    #[test]
    fn huge_amounts_saturate_the_totals() {
        let mut book = SupplierOrderBook::new();
        let branch = UserId::new();
        let half = u64::MAX / 2 + 1;
        delivered(&mut book, branch, "INV-900", half);
        delivered(&mut book, branch, "INV-901", half);

        let summary = book.billing_summary(None, |_| None);
        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.total_outstanding, u64::MAX);
        assert_eq!(summary.total_paid, 0);
    }

    #[test]
    fn undelivered_orders_are_not_billed() {
        let mut book = SupplierOrderBook::new();
        let id = SupplierOrderId::new();
        let events = book
            .decide_new(
                id,
                &SupplierOrderCommand::RequestSupply(RequestSupply {
                    order_id: id,
                    branch_id: UserId::new(),
                    receipt_type: ReceiptType::DeliveryReceipt,
                    quantity_units: 3,
                    request_date: date(),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        book.apply(&events);

        assert_eq!(book.billing_summary(None, |_| None).invoice_count, 0);
        assert_eq!(book.len(), 1);
    }
}
