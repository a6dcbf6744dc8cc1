//! Supplier orders and billing (event-sourced).

pub mod book;
pub mod order;

pub use book::{BillingSummary, SupplierOrderBook};
pub use order::{
    AttachPrf, Billing, ConfirmDelivery, MarkProcessed, MarkShipped, PaymentMarked, PrfAttached,
    RequestSupply, SetPaid, SupplierOrder, SupplierOrderCommand, SupplierOrderEvent,
    SupplierOrderId, SupplierOrderRecord, SupplierOrderStatus, SupplyDelivered, SupplyProcessed,
    SupplyRequested, SupplyShipped,
};
