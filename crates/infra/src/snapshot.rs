//! Plain-record view of every collection, used for export and remote sync.

use serde::{Deserialize, Serialize};

use receiptdesk_branches::UserRecord;
use receiptdesk_inventory::InventoryRecord;
use receiptdesk_orders::ReceiptOrderRecord;
use receiptdesk_purchasing::SupplierOrderRecord;
use receiptdesk_warehouse::WarehouseRecord;

/// Named collections as they appear on the remote side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Inventory,
    Orders,
    Warehouse,
    SupplierOrders,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Users,
        Table::Inventory,
        Table::Orders,
        Table::Warehouse,
        Table::SupplierOrders,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Inventory => "inventory",
            Table::Orders => "orders",
            Table::Warehouse => "warehouse",
            Table::SupplierOrders => "supplier_orders",
        }
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every collection as flat records. Warehouse allocations are flattened to
/// one row per branch and type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<UserRecord>,
    pub inventory: Vec<InventoryRecord>,
    pub orders: Vec<ReceiptOrderRecord>,
    pub warehouse: Vec<WarehouseRecord>,
    pub supplier_orders: Vec<SupplierOrderRecord>,
}

impl Snapshot {
    /// Rows of one table as JSON values.
    pub fn table_rows(&self, table: Table) -> Result<Vec<serde_json::Value>, serde_json::Error> {
        fn rows<T: Serialize>(records: &[T]) -> Result<Vec<serde_json::Value>, serde_json::Error> {
            records.iter().map(serde_json::to_value).collect()
        }

        match table {
            Table::Users => rows(&self.users),
            Table::Inventory => rows(&self.inventory),
            Table::Orders => rows(&self.orders),
            Table::Warehouse => rows(&self.warehouse),
            Table::SupplierOrders => rows(&self.supplier_orders),
        }
    }
}
