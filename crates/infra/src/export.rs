//! CSV export: one flat row per entity, fixed columns per table.

use serde::Serialize;

use receiptdesk_branches::UserRole;

use crate::snapshot::{Snapshot, Table};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer error: {0}")]
    Buffer(String),
    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InventoryRow<'a> {
    branch_id: String,
    company: &'a str,
    #[serde(rename = "type")]
    receipt_type: &'a str,
    current_series_start: u64,
    current_series_end: u64,
    last_used_number: u64,
    remaining_stock: u64,
    threshold: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRow<'a> {
    id: String,
    branch_id: String,
    branch_name: &'a str,
    company: &'a str,
    #[serde(rename = "type")]
    receipt_type: &'a str,
    quantity_units: u32,
    status: &'a str,
    request_date: Option<String>,
    delivery_date: Option<String>,
    series_start: Option<u64>,
    series_end: Option<u64>,
    received_by: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WarehouseRow<'a> {
    branch_id: String,
    #[serde(rename = "type")]
    receipt_type: &'a str,
    total_units: u32,
    receipts_per_unit: u64,
    unit_label: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SupplierOrderRow<'a> {
    id: String,
    branch_id: String,
    #[serde(rename = "type")]
    receipt_type: &'a str,
    quantity_units: u32,
    status: &'a str,
    request_date: Option<String>,
    billing_invoice_no: Option<&'a str>,
    amount: Option<u64>,
    delivery_receipt_no: Option<&'a str>,
    delivery_date: Option<String>,
    prf_number: Option<&'a str>,
    is_paid: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRow<'a> {
    id: String,
    username: &'a str,
    role: &'a str,
    branch_name: Option<&'a str>,
    company: Option<&'a str>,
    tin_number: Option<&'a str>,
}

const INVENTORY_COLUMNS: &[&str] = &[
    "branchId",
    "company",
    "type",
    "currentSeriesStart",
    "currentSeriesEnd",
    "lastUsedNumber",
    "remainingStock",
    "threshold",
];

const ORDER_COLUMNS: &[&str] = &[
    "id",
    "branchId",
    "branchName",
    "company",
    "type",
    "quantityUnits",
    "status",
    "requestDate",
    "deliveryDate",
    "seriesStart",
    "seriesEnd",
    "receivedBy",
];

const WAREHOUSE_COLUMNS: &[&str] = &[
    "branchId",
    "type",
    "totalUnits",
    "receiptsPerUnit",
    "unitLabel",
];

const SUPPLIER_ORDER_COLUMNS: &[&str] = &[
    "id",
    "branchId",
    "type",
    "quantityUnits",
    "status",
    "requestDate",
    "billingInvoiceNo",
    "amount",
    "deliveryReceiptNo",
    "deliveryDate",
    "prfNumber",
    "isPaid",
];

const USER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "role",
    "branchName",
    "company",
    "tinNumber",
];

/// Column names for `table`, in output order.
pub fn columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Inventory => INVENTORY_COLUMNS,
        Table::Orders => ORDER_COLUMNS,
        Table::Warehouse => WAREHOUSE_COLUMNS,
        Table::SupplierOrders => SUPPLIER_ORDER_COLUMNS,
        Table::Users => USER_COLUMNS,
    }
}

/// The header row is written up front so an empty table still carries it.
fn to_csv<T: Serialize>(
    table: Table,
    rows: impl IntoIterator<Item = T>,
) -> Result<String, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(columns(table))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn date(d: Option<chrono::NaiveDate>) -> Option<String> {
    d.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Render one table of `snapshot` as CSV with a header row.
pub fn export_csv(snapshot: &Snapshot, table: Table) -> Result<String, ExportError> {
    match table {
        Table::Inventory => to_csv(table, snapshot.inventory.iter().map(|r| InventoryRow {
            branch_id: r.branch_id.to_string(),
            company: &r.company,
            receipt_type: r.receipt_type.as_str(),
            current_series_start: r.current_series_start,
            current_series_end: r.current_series_end,
            last_used_number: r.last_used_number,
            remaining_stock: r.remaining_stock,
            threshold: r.threshold,
        })),
        Table::Orders => to_csv(table, snapshot.orders.iter().map(|r| OrderRow {
            id: r.id.to_string(),
            branch_id: r.branch_id.to_string(),
            branch_name: &r.branch_name,
            company: &r.company,
            receipt_type: r.receipt_type.as_str(),
            quantity_units: r.quantity_units,
            status: r.status.as_str(),
            request_date: date(r.request_date),
            delivery_date: date(r.delivery_date),
            series_start: r.series_start,
            series_end: r.series_end,
            received_by: r.received_by.as_deref(),
        })),
        Table::Warehouse => to_csv(table, snapshot.warehouse.iter().map(|r| WarehouseRow {
            branch_id: r.branch_id.to_string(),
            receipt_type: r.receipt_type.as_str(),
            total_units: r.total_units,
            receipts_per_unit: r.receipts_per_unit,
            unit_label: r.unit_label.as_str(),
        })),
        Table::SupplierOrders => to_csv(table, snapshot.supplier_orders.iter().map(|r| SupplierOrderRow {
            id: r.id.to_string(),
            branch_id: r.branch_id.to_string(),
            receipt_type: r.receipt_type.as_str(),
            quantity_units: r.quantity_units,
            status: r.status.as_str(),
            request_date: date(r.request_date),
            billing_invoice_no: r.billing_invoice_no.as_deref(),
            amount: r.amount,
            delivery_receipt_no: r.delivery_receipt_no.as_deref(),
            delivery_date: date(r.delivery_date),
            prf_number: r.prf_number.as_deref(),
            is_paid: r.is_paid,
        })),
        Table::Users => to_csv(table, snapshot.users.iter().map(|r| UserRow {
            id: r.id.to_string(),
            username: &r.username,
            role: match r.role {
                UserRole::Admin => "ADMIN",
                UserRole::Branch => "BRANCH",
            },
            branch_name: r.branch_name.as_deref(),
            company: r.company.as_deref(),
            tin_number: r.tin_number.as_deref(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_csv_has_the_fixed_columns() {
        let store = crate::seed::demo_store().unwrap();
        let csv = export_csv(&store.snapshot(), Table::Inventory).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some(
                "branchId,company,type,currentSeriesStart,currentSeriesEnd,\
                 lastUsedNumber,remainingStock,threshold"
            )
        );
        assert_eq!(lines.count(), 4);
        assert!(csv.contains(",PMCI,Sales Invoice,1000,5000,4850,150,5000"));
    }

    #[test]
    fn orders_csv_leaves_unshipped_series_blank() {
        let store = crate::seed::demo_store().unwrap();
        let csv = export_csv(&store.snapshot(), Table::Orders).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",Megamall,PMCI,Sales Invoice,5,PENDING,2023-10-25,,,,"));
    }

    #[test]
    fn empty_table_still_has_its_header() {
        let csv = export_csv(&Snapshot::default(), Table::Inventory).unwrap();
        assert_eq!(
            csv,
            "branchId,company,type,currentSeriesStart,currentSeriesEnd,\
             lastUsedNumber,remainingStock,threshold\n"
        );
    }

    #[test]
    fn header_matches_serialized_field_order() {
        let store = crate::seed::demo_store().unwrap();
        let snapshot = store.snapshot();
        for table in [Table::Users, Table::Inventory, Table::Orders, Table::Warehouse] {
            let csv = export_csv(&snapshot, table).unwrap();
            let mut rdr = csv::Reader::from_reader(csv.as_bytes());
            let headers = rdr.headers().unwrap().clone();
            assert_eq!(headers.iter().collect::<Vec<_>>(), columns(table), "{table}");
            for record in rdr.records() {
                assert_eq!(record.unwrap().len(), columns(table).len(), "{table}");
            }
        }
    }
}
