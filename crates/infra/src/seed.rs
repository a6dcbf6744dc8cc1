//! Demo dataset: one administrator, three branches and their starting stock.
//!
//! Loaded through the same record path as a remote import, so the activity
//! journal starts empty.

use chrono::NaiveDate;

use receiptdesk_branches::{User, UserRecord, UserRole};
use receiptdesk_core::{DomainResult, UserId};
use receiptdesk_inventory::{InventoryEntry, InventoryRecord};
use receiptdesk_orders::{OrderStatus, ReceiptOrder, ReceiptOrderId, ReceiptOrderRecord};
use receiptdesk_receipts::{ReceiptType, receipts_per_unit, threshold_for, unit_label_for};
use receiptdesk_warehouse::{WarehouseItem, WarehouseRecord};

use crate::store::ReceiptStore;

pub const ADMIN_USERNAME: &str = "CW@Admin";

struct DemoBranch {
    username: &'static str,
    branch_name: &'static str,
    company: &'static str,
}

const BRANCHES: [DemoBranch; 3] = [
    DemoBranch { username: "manila_br", branch_name: "Megamall", company: "PMCI" },
    DemoBranch { username: "cebu_br", branch_name: "Seaside Cebu", company: "PMCI" },
    DemoBranch { username: "davao_br", branch_name: "SM Davao", company: "PEHI" },
];

// (branch index, type, start, end, last used, remaining)
const INVENTORY: [(usize, ReceiptType, u64, u64, u64, u64); 4] = [
    (0, ReceiptType::SalesInvoice, 1000, 5000, 4850, 150),
    (0, ReceiptType::CollectionReceipt, 100, 500, 300, 200),
    (1, ReceiptType::SalesInvoice, 5001, 10000, 6000, 4000),
    (2, ReceiptType::ServiceInvoice, 20000, 25000, 24900, 100),
];

const WAREHOUSE: [(usize, ReceiptType, u32); 5] = [
    (0, ReceiptType::SalesInvoice, 15),
    (0, ReceiptType::CollectionReceipt, 20),
    (1, ReceiptType::SalesInvoice, 10),
    (1, ReceiptType::DeliveryReceipt, 30),
    (2, ReceiptType::ServiceInvoice, 25),
];

/// Build a store holding the demo dataset.
pub fn demo_store() -> DomainResult<ReceiptStore> {
    let mut store = ReceiptStore::new();
    let branch_ids: Vec<UserId> = BRANCHES.iter().map(|_| UserId::new()).collect();

    let mut users = vec![User::from_record(UserRecord {
        id: UserId::new(),
        username: ADMIN_USERNAME.to_string(),
        role: UserRole::Admin,
        branch_name: None,
        company: None,
        tin_number: None,
    })?];
    for (branch, id) in BRANCHES.iter().zip(&branch_ids) {
        users.push(User::from_record(UserRecord {
            id: *id,
            username: branch.username.to_string(),
            role: UserRole::Branch,
            branch_name: Some(branch.branch_name.to_string()),
            company: Some(branch.company.to_string()),
            tin_number: None,
        })?);
    }
    store.replace_users(users);

    let inventory = INVENTORY
        .iter()
        .map(|&(idx, receipt_type, start, end, last_used, remaining)| {
            InventoryEntry::from_record(InventoryRecord {
                branch_id: branch_ids[idx],
                company: BRANCHES[idx].company.to_string(),
                receipt_type,
                current_series_start: start,
                current_series_end: end,
                last_used_number: last_used,
                remaining_stock: remaining,
                threshold: threshold_for(receipt_type),
                last_update_date: None,
                last_updated_by: None,
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;
    store.replace_inventory(inventory);

    let megamall = &BRANCHES[0];
    let order = ReceiptOrder::from_record(ReceiptOrderRecord {
        id: ReceiptOrderId::new(),
        branch_id: branch_ids[0],
        branch_name: megamall.branch_name.to_string(),
        company: megamall.company.to_string(),
        receipt_type: ReceiptType::SalesInvoice,
        quantity_units: 5,
        status: OrderStatus::Pending,
        request_date: NaiveDate::from_ymd_opt(2023, 10, 25),
        delivery_date: None,
        series_start: None,
        series_end: None,
        received_by: None,
    })?;
    store.replace_orders(vec![order]);

    let warehouse = WAREHOUSE
        .iter()
        .map(|&(idx, receipt_type, units)| {
            WarehouseItem::from_record(WarehouseRecord {
                branch_id: branch_ids[idx],
                receipt_type,
                total_units: units,
                receipts_per_unit: receipts_per_unit(receipt_type),
                unit_label: unit_label_for(receipt_type),
            })
        })
        .collect();
    store.replace_warehouse(warehouse);

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_data_matches_the_starting_dashboard() {
        let store = demo_store().unwrap();
        assert_eq!(store.users().count(), 4);
        assert!(store.authenticate(ADMIN_USERNAME).unwrap().is_admin());

        let manila = store.authenticate("manila_br").unwrap().id_typed();
        let si = store.inventory_entry(manila, ReceiptType::SalesInvoice).unwrap();
        assert_eq!(si.current_series_end(), 5000);
        assert_eq!(si.remaining_stock(), 150);
        assert!(si.is_low_stock());

        assert_eq!(store.warehouse_available(manila, ReceiptType::SalesInvoice), Some(15));
        assert_eq!(store.list_orders(Some(manila)).len(), 1);
        assert_eq!(store.low_stock(None).len(), 4);
        assert!(store.journal().is_empty());
    }
}
