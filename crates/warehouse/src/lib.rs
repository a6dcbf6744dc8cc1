//! Warehouse allocation: units held centrally on behalf of each branch.

pub mod item;
pub mod store;

pub use item::{
    AdjustUnits, EnsureItem, ItemOpened, UnitsAdjusted, WarehouseCommand, WarehouseEvent,
    WarehouseItem, WarehouseRecord,
};
pub use store::WarehouseStore;
