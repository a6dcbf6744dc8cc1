//! Integration tests for the full store pipeline.
//!
//! Tests: operation → decide on every aggregate → apply → journal + EventBus
//!
//! Verifies:
//! - Orders move warehouse units and inventory series consistently
//! - Failed operations leave every collection untouched
//! - Branch delete cascades, company edits propagate
//! - Sync import/export and CSV run over the same snapshot

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use receiptdesk_core::{DomainError, UserId};
    use receiptdesk_events::{EventBus, InMemoryEventBus};
    use receiptdesk_orders::{OrderStatus, ReceiptOrderId};
    use receiptdesk_purchasing::{Billing, SupplierOrderStatus};
    use receiptdesk_receipts::{ReceiptType, UnitLabel};

    use crate::export::export_csv;
    use crate::seed::demo_store;
    use crate::snapshot::{Snapshot, Table};
    use crate::store::{ActivityBus, BranchPatch, NewBranch, ReceiptStore};
    use crate::sync::{CloudSync, InMemoryRemoteTables, RemoteTables};

    fn setup() -> (ReceiptStore, UserId) {
        let store = demo_store().unwrap();
        let manila = store.authenticate("manila_br").unwrap().id_typed();
        (store, manila)
    }

    fn branch(store: &ReceiptStore, username: &str) -> UserId {
        store.authenticate(username).unwrap().id_typed()
    }

    fn seeded_order(store: &ReceiptStore, branch: UserId) -> ReceiptOrderId {
        store.list_orders(Some(branch))[0].id_typed()
    }

    fn billing(invoice: &str, amount: u64) -> Billing {
        Billing {
            billing_invoice_no: invoice.to_string(),
            amount,
            delivery_receipt_no: "DR-7781".to_string(),
            delivery_date: NaiveDate::from_ymd_opt(2023, 11, 6).unwrap(),
        }
    }

    /// Ship an order of `units` for `branch`/`receipt_type` and return its id.
    fn shipped_order(store: &mut ReceiptStore, branch: UserId, receipt_type: ReceiptType, units: u32) -> ReceiptOrderId {
        let id = store.request_order(branch, receipt_type, units).unwrap().id_typed();
        store.approve_order(id).unwrap();
        store.ship_order(id, None).unwrap();
        id
    }

    #[test]
    fn shipping_takes_warehouse_units_and_continues_the_series() {
        let (mut store, manila) = setup();
        let id = seeded_order(&store, manila);

        store.approve_order(id).unwrap();
        let order = store.ship_order(id, None).unwrap();

        assert_eq!(order.status(), OrderStatus::InTransit);
        let range = order.series().unwrap();
        assert_eq!((range.start, range.end), (5001, 7500));
        assert!(order.delivery_date().is_some());
        assert_eq!(store.warehouse_available(manila, ReceiptType::SalesInvoice), Some(10));
    }

    #[test]
    fn consumption_after_receipt_draws_down_remaining_stock() {
        let (mut store, manila) = setup();
        let id = seeded_order(&store, manila);
        store.approve_order(id).unwrap();
        store.ship_order(id, None).unwrap();
        store.mark_delivered(id).unwrap();
        let order = store.confirm_receipt(id, "Liza (Megamall)").unwrap();
        assert_eq!(order.status(), OrderStatus::Received);
        assert_eq!(order.received_by(), Some("Liza (Megamall)"));

        let entry = store.inventory_entry(manila, ReceiptType::SalesInvoice).unwrap();
        assert_eq!(entry.current_series_end(), 7500);
        assert_eq!(entry.remaining_stock(), 150 + 2500);

        let entry = store
            .log_consumption(manila, ReceiptType::SalesInvoice, 5200, None, "Liza")
            .unwrap();
        assert_eq!(entry.last_used_number(), 5200);
        assert_eq!(entry.remaining_stock(), 2650 - 350);
        assert_eq!(entry.last_updated_by(), Some("Liza"));
    }

    #[test]
    fn insufficient_warehouse_stock_changes_nothing() {
        let (mut store, manila) = setup();
        let id = store.request_order(manila, ReceiptType::SalesInvoice, 20).unwrap().id_typed();
        store.approve_order(id).unwrap();
        let before = store.snapshot();
        let journal_len = store.journal().len();

        let err = store.ship_order(id, None).unwrap_err();
        assert!(matches!(err, DomainError::Precondition(_)), "{err}");

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.journal().len(), journal_len);
        assert_eq!(store.order(id).unwrap().status(), OrderStatus::Approved);
        assert_eq!(store.warehouse_available(manila, ReceiptType::SalesInvoice), Some(15));
    }

    #[test]
    fn supplier_delivery_creates_missing_warehouse_item() {
        let (mut store, _) = setup();
        let cebu = branch(&store, "cebu_br");
        assert_eq!(store.warehouse_available(cebu, ReceiptType::CollectionReceipt), None);

        let id = store.request_supply(cebu, ReceiptType::CollectionReceipt, 12).unwrap().id_typed();
        store.process_supply(id).unwrap();
        store.ship_supply(id).unwrap();
        let order = store.confirm_supply_delivery(id, billing("SI-2023-118", 1_250_000)).unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::Delivered);

        let item = store
            .warehouse_for(cebu)
            .into_iter()
            .find(|i| i.receipt_type() == ReceiptType::CollectionReceipt)
            .unwrap();
        assert_eq!(item.total_units(), 12);
        assert_eq!(item.receipts_per_unit(), 50);
        assert_eq!(item.unit_label(), UnitLabel::Booklet);
    }

    #[test]
    fn first_receipt_opens_the_inventory_entry() {
        let (mut store, _) = setup();
        let davao = branch(&store, "davao_br");
        store.replenish_warehouse(davao, ReceiptType::DeliveryReceipt, 4).unwrap();
        assert!(store.inventory_entry(davao, ReceiptType::DeliveryReceipt).is_none());

        let id = shipped_order(&mut store, davao, ReceiptType::DeliveryReceipt, 4);
        store.mark_delivered(id).unwrap();
        store.confirm_receipt(id, "Ramon").unwrap();

        let entry = store.inventory_entry(davao, ReceiptType::DeliveryReceipt).unwrap();
        assert_eq!(entry.current_series_start(), 1);
        assert_eq!(entry.current_series_end(), 200);
        assert_eq!(entry.last_used_number(), 0);
        assert_eq!(entry.remaining_stock(), 200);
        assert_eq!(entry.company(), "PEHI");
        assert_eq!(entry.threshold(), 250);
        assert!(entry.is_low_stock());
    }

    #[test]
    fn shipping_twice_fails_without_a_second_decrement() {
        let (mut store, manila) = setup();
        let id = seeded_order(&store, manila);
        store.approve_order(id).unwrap();
        store.ship_order(id, None).unwrap();

        let err = store.ship_order(id, None).unwrap_err();
        assert!(matches!(err, DomainError::Precondition(_)));
        assert_eq!(store.warehouse_available(manila, ReceiptType::SalesInvoice), Some(10));
    }

    #[test]
    fn consecutive_shipments_are_contiguous_before_receipt() {
        let (mut store, manila) = setup();
        let first = shipped_order(&mut store, manila, ReceiptType::CollectionReceipt, 2);
        let second = shipped_order(&mut store, manila, ReceiptType::CollectionReceipt, 3);

        let r1 = store.order(first).unwrap().series().unwrap();
        let r2 = store.order(second).unwrap().series().unwrap();
        assert_eq!((r1.start, r1.end), (501, 600));
        assert_eq!(r2.start, r1.end + 1);
        assert_eq!(r2.end, 750);
        assert_eq!(store.warehouse_available(manila, ReceiptType::CollectionReceipt), Some(15));
    }

    #[test]
    fn explicit_start_must_clear_the_high_water_mark() {
        let (mut store, manila) = setup();
        let id = seeded_order(&store, manila);
        store.approve_order(id).unwrap();

        let err = store.ship_order(id, Some(4000)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(store.warehouse_available(manila, ReceiptType::SalesInvoice), Some(15));

        let order = store.ship_order(id, Some(9001)).unwrap();
        let range = order.series().unwrap();
        assert_eq!((range.start, range.end), (9001, 11500));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let (mut store, manila) = setup();
        let missing = ReceiptOrderId::new();
        assert!(matches!(store.approve_order(missing), Err(DomainError::NotFound(_))));
        assert!(matches!(store.ship_order(missing, None), Err(DomainError::NotFound(_))));
        assert!(matches!(store.delete_branch(UserId::new()), Err(DomainError::NotFound(_))));
        assert!(matches!(
            store.log_consumption(manila, ReceiptType::ServiceInvoice, 10, None, "Liza"),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            store.adjust_warehouse(manila, ReceiptType::ServiceInvoice, 3),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn cancelled_orders_cannot_ship() {
        let (mut store, manila) = setup();
        let id = seeded_order(&store, manila);
        store.approve_order(id).unwrap();
        assert_eq!(store.cancel_order(id).unwrap().status(), OrderStatus::Cancelled);

        assert!(matches!(store.ship_order(id, None), Err(DomainError::Precondition(_))));
        assert_eq!(store.warehouse_available(manila, ReceiptType::SalesInvoice), Some(15));
    }

    #[test]
    fn editing_a_request_to_a_new_type_opens_its_warehouse_item() {
        let (mut store, manila) = setup();
        let id = seeded_order(&store, manila);
        assert_eq!(store.warehouse_available(manila, ReceiptType::ServiceInvoice), None);

        let order = store.edit_request(id, ReceiptType::ServiceInvoice, 2).unwrap();
        assert_eq!(order.receipt_type(), ReceiptType::ServiceInvoice);
        assert_eq!(order.quantity_units(), 2);
        assert_eq!(store.warehouse_available(manila, ReceiptType::ServiceInvoice), Some(0));
    }

    #[test]
    fn deleting_a_branch_cascades() {
        let (mut store, manila) = setup();
        store.request_supply(manila, ReceiptType::SalesInvoice, 4).unwrap();

        let removal = store.delete_branch(manila).unwrap();
        assert_eq!(removal.inventory_entries, 2);
        assert_eq!(removal.warehouse_items, 2);
        assert_eq!(removal.orders, 1);
        assert_eq!(removal.supplier_orders, 1);

        assert!(store.authenticate("manila_br").is_err());
        assert!(store.list_inventory(Some(manila)).is_empty());
        assert!(store.warehouse_for(manila).is_empty());
        assert_eq!(store.list_branches().len(), 2);

        let admin = store.authenticate("CW@Admin").unwrap().id_typed();
        assert!(matches!(store.delete_branch(admin), Err(DomainError::Precondition(_))));
    }

    #[test]
    fn company_change_propagates_to_inventory() {
        let (mut store, manila) = setup();
        let patch = BranchPatch {
            company: Some("PEHI".to_string()),
            ..BranchPatch::default()
        };
        let user = store.update_branch(manila, patch).unwrap();
        assert_eq!(user.company(), Some("PEHI"));

        for entry in store.list_inventory(Some(manila)) {
            assert_eq!(entry.company(), "PEHI");
        }
        let cebu = branch(&store, "cebu_br");
        assert_eq!(
            store.inventory_entry(cebu, ReceiptType::SalesInvoice).unwrap().company(),
            "PMCI"
        );
    }

    #[test]
    fn usernames_stay_unique() {
        let (mut store, manila) = setup();
        let err = store
            .register_branch(NewBranch {
                username: "cebu_br".to_string(),
                branch_name: "Ayala Cebu".to_string(),
                company: "PMCI".to_string(),
                tin_number: None,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let patch = BranchPatch {
            username: Some("davao_br".to_string()),
            ..BranchPatch::default()
        };
        assert!(matches!(store.update_branch(manila, patch), Err(DomainError::Conflict(_))));
        assert!(matches!(store.register_admin("root"), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn billing_summary_over_delivered_supply() {
        let (mut store, manila) = setup();
        let davao = branch(&store, "davao_br");

        for (branch, invoice, amount) in [(manila, "INV-500", 400_000), (davao, "INV-501", 150_000)] {
            let id = store.request_supply(branch, ReceiptType::SalesInvoice, 2).unwrap().id_typed();
            store.ship_supply(id).unwrap();
            store.confirm_supply_delivery(id, billing(invoice, amount)).unwrap();
            if branch == manila {
                store.set_paid(id, true).unwrap();
                store.attach_prf(id, "PRF-0091").unwrap();
            }
        }

        let summary = store.billing_summary(None);
        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.total_paid, 400_000);
        assert_eq!(summary.total_outstanding, 150_000);
        assert_eq!(store.billing_archive(Some("sm davao")).len(), 1);
        assert_eq!(store.billing_archive(Some("prf-0091")).len(), 1);
        assert_eq!(store.warehouse_available(davao, ReceiptType::SalesInvoice), Some(2));
    }

    #[test]
    fn mutations_are_journaled_and_published() {
        let bus: Arc<ActivityBus> = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let mut store = demo_store().unwrap().with_bus(bus.clone());
        let manila = branch(&store, "manila_br");
        let id = seeded_order(&store, manila);

        store.approve_order(id).unwrap();
        store.ship_order(id, None).unwrap();

        let types: Vec<String> = store
            .journal()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(
            types,
            [
                "orders.receipt_order.approved",
                "orders.receipt_order.shipped",
                "warehouse.item.units_adjusted",
            ]
        );

        let published = sub.drain();
        assert_eq!(published.len(), 3);
        assert_eq!(published[1].aggregate_key(), id.to_string());
        assert_eq!(published[2].sequence_number(), 3);

        let _ = store.approve_order(id).unwrap_err();
        assert_eq!(store.journal().len(), 3);
        assert!(sub.try_recv().is_err());
        assert_eq!(store.recent_activity(1)[0].event_type(), "warehouse.item.units_adjusted");
    }

    #[test]
    fn order_history_and_inventory_search() {
        let (mut store, manila) = setup();
        let id = seeded_order(&store, manila);
        store.approve_order(id).unwrap();
        store.ship_order(id, None).unwrap();
        store.mark_delivered(id).unwrap();
        assert!(store.order_history("megamall").is_empty());
        store.confirm_receipt(id, "Liza").unwrap();

        assert_eq!(store.order_history("megamall").len(), 1);
        assert_eq!(store.order_history("sales").len(), 1);
        assert!(store.order_history("cebu").is_empty());

        assert_eq!(store.search_inventory("pehi").len(), 1);
        assert_eq!(store.search_inventory("seaside").len(), 1);
        assert_eq!(store.search_inventory("sales invoice").len(), 2);
        assert_eq!(store.search_inventory("").len(), 4);
    }

    #[tokio::test]
    async fn export_then_import_reproduces_the_snapshot() {
        let (store, _) = setup();
        let sync = CloudSync::new(InMemoryRemoteTables::new());

        let report = sync.export_all(&store.snapshot()).await.unwrap();
        assert!(report.rows.contains(&(Table::Warehouse, 5)));

        let mut fresh = ReceiptStore::new();
        let imported = sync.import_all(&mut fresh).await.unwrap();
        assert_eq!(imported.table(Table::Inventory).unwrap().imported, 4);
        assert_eq!(fresh.snapshot(), store.snapshot());
    }

    #[tokio::test]
    async fn import_keeps_local_data_for_empty_tables_and_skips_bad_rows() {
        let (store, manila) = setup();
        let remote = InMemoryRemoteTables::new();
        let mut rows = store.snapshot().table_rows(Table::Orders).unwrap();
        rows.push(serde_json::json!({ "id": "not-a-uuid", "status": "PENDING" }));
        remote.replace(Table::Orders, rows).await.unwrap();
        let sync = CloudSync::new(remote);

        let mut local = demo_store().unwrap();
        let local_users = local.snapshot().users;
        let report = sync.import_all(&mut local).await.unwrap();

        let orders = report.table(Table::Orders).unwrap();
        assert_eq!((orders.imported, orders.skipped, orders.replaced), (1, 1, true));
        assert!(!report.table(Table::Users).unwrap().replaced);
        assert_eq!(local.snapshot().users, local_users);
        assert_eq!(local.list_orders(None)[0].branch_id(), manila);
    }

    #[tokio::test]
    async fn import_keeps_local_data_when_no_remote_row_decodes() {
        let remote = InMemoryRemoteTables::new();
        remote
            .replace(
                Table::Inventory,
                vec![serde_json::json!({
                    "branchId": "c1b1c1b1-0000-4000-8000-000000000001",
                    "company": "PMCI",
                    "type": "Sales Invoice",
                    "currentSeriesStart": 1000,
                    "currentSeriesEnd": 5000,
                    "lastUsedNumber": 4850,
                    "remainingStock": 150,
                    "threshold": 5000
                })],
            )
            .await
            .unwrap();
        let sync = CloudSync::new(remote);

        let mut local = demo_store().unwrap();
        let before = local.snapshot().inventory;
        let report = sync.import_all(&mut local).await.unwrap();

        let inventory = report.table(Table::Inventory).unwrap();
        assert_eq!((inventory.imported, inventory.skipped, inventory.replaced), (0, 1, false));
        assert_eq!(local.snapshot().inventory, before);
        assert_eq!(before.len(), 4);
    }

    #[tokio::test]
    async fn import_rejects_a_table_that_is_mostly_bad_rows() {
        let (store, _) = setup();
        let remote = InMemoryRemoteTables::new();
        let mut rows = store.snapshot().table_rows(Table::Orders).unwrap();
        rows.push(serde_json::json!({ "id": "broken-1" }));
        rows.push(serde_json::json!({ "id": "broken-2" }));
        remote.replace(Table::Orders, rows).await.unwrap();
        let sync = CloudSync::new(remote);

        let mut local = demo_store().unwrap();
        let before = local.snapshot().orders;
        let report = sync.import_all(&mut local).await.unwrap();

        let orders = report.table(Table::Orders).unwrap();
        assert_eq!((orders.skipped, orders.replaced), (2, false));
        assert_eq!(local.snapshot().orders, before);
    }

    #[test]
    fn extreme_warehouse_adjustments_saturate() {
        let (mut store, manila) = setup();

        let item = store
            .adjust_warehouse(manila, ReceiptType::SalesInvoice, i64::MAX)
            .unwrap();
        assert_eq!(item.total_units(), u32::MAX);

        let item = store
            .adjust_warehouse(manila, ReceiptType::SalesInvoice, i64::MIN)
            .unwrap();
        assert_eq!(item.total_units(), 0);
    }

    #[test]
    fn journal_keeps_only_the_newest_entries() {
        let (store, manila) = setup();
        let mut store = store.with_journal_capacity(2);
        let id = seeded_order(&store, manila);

        store.approve_order(id).unwrap();
        store.ship_order(id, None).unwrap();
        store.mark_delivered(id).unwrap();

        let journal = store.journal();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].event_type(), "warehouse.item.units_adjusted");
        assert_eq!(journal[1].event_type(), "orders.receipt_order.delivered");
        assert_eq!(journal[1].sequence_number(), 4);
    }

    #[test]
    fn csv_export_covers_every_table() {
        let (mut store, manila) = setup();
        store.request_supply(manila, ReceiptType::ServiceInvoice, 3).unwrap();
        let snapshot = store.snapshot();
        for table in Table::ALL {
            let csv = export_csv(&snapshot, table).unwrap();
            assert!(csv.lines().count() > 1, "{table} exported no rows");
        }

        let inventory = export_csv(&snapshot, Table::Inventory).unwrap();
        assert_eq!(
            inventory.lines().next(),
            Some("branchId,company,type,currentSeriesStart,currentSeriesEnd,lastUsedNumber,remainingStock,threshold")
        );
        assert_eq!(
            export_csv(&Snapshot::default(), Table::Users).unwrap(),
            "id,username,role,branchName,company,tinNumber\n"
        );
    }
}
