use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use receiptdesk_branches::{User, UserRecord};
use receiptdesk_core::UserId;
use receiptdesk_inventory::{InventoryEntry, InventoryRecord};
use receiptdesk_orders::{ReceiptOrder, ReceiptOrderRecord};
use receiptdesk_purchasing::{BillingSummary, SupplierOrder, SupplierOrderRecord};
use receiptdesk_receipts::ReceiptType;
use receiptdesk_warehouse::{WarehouseItem, WarehouseRecord};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct BranchQuery {
    pub branch_id: Option<UserId>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterBranchRequest {
    pub username: String,
    pub branch_name: String,
    pub company: String,
    pub tin_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBranchRequest {
    pub username: Option<String>,
    pub branch_name: Option<String>,
    pub company: Option<String>,
    pub tin_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogConsumptionRequest {
    pub branch_id: Option<UserId>,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub new_last_used: u64,
    pub date: Option<NaiveDate>,
    pub logged_by: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplenishRequest {
    pub branch_id: UserId,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub units: u32,
}

#[derive(Debug, Deserialize)]
pub struct AdjustWarehouseRequest {
    pub branch_id: UserId,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct RequestOrderRequest {
    pub branch_id: Option<UserId>,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
}

#[derive(Debug, Deserialize)]
pub struct EditOrderRequest {
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShipOrderRequest {
    pub start_series: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmReceiptRequest {
    pub received_by: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestSupplyRequest {
    pub branch_id: UserId,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub quantity_units: u32,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmSupplyRequest {
    pub billing_invoice_no: String,
    /// Centavos.
    pub amount: u64,
    pub delivery_receipt_no: String,
    pub delivery_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AttachPrfRequest {
    pub prf_number: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPaidRequest {
    pub paid: bool,
}

// -------------------------
// Response DTOs
// -------------------------

pub fn user_view(user: &User) -> UserRecord {
    user.to_record()
}

#[derive(Debug, Serialize)]
pub struct InventoryView {
    #[serde(flatten)]
    pub record: InventoryRecord,
    pub is_low_stock: bool,
}

pub fn inventory_view(entry: &InventoryEntry) -> InventoryView {
    InventoryView {
        record: entry.to_record(),
        is_low_stock: entry.is_low_stock(),
    }
}

pub fn warehouse_view(item: &WarehouseItem) -> WarehouseRecord {
    item.to_record()
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub record: ReceiptOrderRecord,
    pub total_receipts: u64,
}

pub fn order_view(order: &ReceiptOrder) -> OrderView {
    OrderView {
        record: order.to_record(),
        total_receipts: order.total_receipts(),
    }
}

pub fn supplier_order_view(order: &SupplierOrder) -> SupplierOrderRecord {
    order.to_record()
}

#[derive(Debug, Serialize)]
pub struct BillingView {
    pub summary: BillingSummary,
    pub orders: Vec<SupplierOrderRecord>,
}
