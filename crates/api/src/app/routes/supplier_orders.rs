use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use receiptdesk_core::DomainResult;
use receiptdesk_purchasing::{Billing, SupplierOrder, SupplierOrderId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

/// Supplier procurement. Administrator only.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_supplier_orders).post(request_supply))
        .route("/:id", get(get_supplier_order))
        .route("/:id/process", post(process))
        .route("/:id/ship", post(ship))
        .route("/:id/deliver", post(confirm_delivery))
        .route("/:id/prf", post(attach_prf))
        .route("/:id/paid", post(set_paid))
}

fn respond(result: DomainResult<SupplierOrder>) -> axum::response::Response {
    match result {
        Ok(order) => Json(dto::supplier_order_view(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn admin_and_id(actor: &ActorContext, raw: &str) -> Result<SupplierOrderId, axum::response::Response> {
    authz::require_admin(actor)?;
    errors::parse_id(raw)
}

pub async fn list_supplier_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let store = services.store.lock().await;
    let body: Vec<_> = store
        .list_supplier_orders()
        .into_iter()
        .map(dto::supplier_order_view)
        .collect();
    Json(body).into_response()
}

pub async fn get_supplier_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match admin_and_id(&actor, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let store = services.store.lock().await;
    respond(store.supplier_order(id).cloned())
}

pub async fn request_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::RequestSupplyRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let mut store = services.store.lock().await;
    match store.request_supply(body.branch_id, body.receipt_type, body.quantity_units) {
        Ok(order) => (StatusCode::CREATED, Json(dto::supplier_order_view(&order))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn process(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match admin_and_id(&actor, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond(services.store.lock().await.process_supply(id))
}

pub async fn ship(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match admin_and_id(&actor, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond(services.store.lock().await.ship_supply(id))
}

/// Record billing details; the delivered units go to the branch's warehouse
/// allocation.
pub async fn confirm_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ConfirmSupplyRequest>,
) -> axum::response::Response {
    let id = match admin_and_id(&actor, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let billing = Billing {
        billing_invoice_no: body.billing_invoice_no,
        amount: body.amount,
        delivery_receipt_no: body.delivery_receipt_no,
        delivery_date: body.delivery_date,
    };
    respond(services.store.lock().await.confirm_supply_delivery(id, billing))
}

pub async fn attach_prf(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AttachPrfRequest>,
) -> axum::response::Response {
    let id = match admin_and_id(&actor, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond(services.store.lock().await.attach_prf(id, &body.prf_number))
}

pub async fn set_paid(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetPaidRequest>,
) -> axum::response::Response {
    let id = match admin_and_id(&actor, &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond(services.store.lock().await.set_paid(id, body.paid))
}
