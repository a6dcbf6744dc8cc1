//! Branch inventory ledger (event-sourced).
//!
//! Pure domain logic: series positions per branch and receipt type, no IO.

pub mod entry;
pub mod ledger;

pub use entry::{
    ChangeCompany, CompanyChanged, ConsumptionLogged, CreditDelivery, DeliveryCredited,
    InventoryCommand, InventoryEntry, InventoryEvent, InventoryRecord, LogConsumption,
    SeriesOpened,
};
pub use ledger::InventoryLedger;
