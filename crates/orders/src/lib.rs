//! Receipt order lifecycle (event-sourced).
//!
//! PENDING -> APPROVED -> IN_TRANSIT -> DELIVERED -> RECEIVED, with CANCELLED
//! reachable before shipment.

pub mod book;
pub mod order;

pub use book::OrderBook;
pub use order::{
    ApproveOrder, CancelOrder, ConfirmReceipt, EditRequest, MarkDelivered, OrderApproved,
    OrderCancelled, OrderDelivered, OrderRequested, OrderShipped, OrderStatus, ReceiptConfirmed,
    ReceiptOrder, ReceiptOrderCommand, ReceiptOrderEvent, ReceiptOrderId, ReceiptOrderRecord,
    RequestEdited, RequestOrder, ShipOrder,
};
