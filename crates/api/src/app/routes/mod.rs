use axum::{Router, routing::get};

pub mod billing;
pub mod branches;
pub mod data;
pub mod inventory;
pub mod orders;
pub mod supplier_orders;
pub mod system;
pub mod warehouse;

/// Router for every endpoint that needs an acting user.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/activity", get(system::activity))
        .nest("/branches", branches::router())
        .nest("/inventory", inventory::router())
        .nest("/warehouse", warehouse::router())
        .nest("/orders", orders::router())
        .nest("/supplier-orders", supplier_orders::router())
        .nest("/billing", billing::router())
        .nest("/data", data::router())
}
