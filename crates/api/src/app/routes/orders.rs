use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use receiptdesk_core::DomainResult;
use receiptdesk_infra::ReceiptStore;
use receiptdesk_orders::{ReceiptOrder, ReceiptOrderId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(request_order))
        .route("/history", get(order_history))
        .route("/:id", get(get_order).put(edit_request))
        .route("/:id/approve", post(approve))
        .route("/:id/ship", post(ship))
        .route("/:id/deliver", post(mark_delivered))
        .route("/:id/confirm", post(confirm_receipt))
        .route("/:id/cancel", post(cancel))
}

fn order_id(raw: &str) -> Result<ReceiptOrderId, axum::response::Response> {
    errors::parse_id(raw)
}

fn respond(result: DomainResult<ReceiptOrder>) -> axum::response::Response {
    match result {
        Ok(order) => Json(dto::order_view(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Load the order and check the actor may touch it.
fn owned_order(
    store: &ReceiptStore,
    actor: &ActorContext,
    id: ReceiptOrderId,
) -> Result<(), axum::response::Response> {
    let order = store.order(id).map_err(errors::domain_error_to_response)?;
    authz::require_owner_or_admin(actor, order.branch_id())
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::BranchQuery>,
) -> axum::response::Response {
    let branch = match authz::branch_filter(&actor, query.branch_id) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let store = services.store.lock().await;
    let body: Vec<_> = store
        .list_orders(branch)
        .into_iter()
        .map(dto::order_view)
        .collect();
    Json(body).into_response()
}

/// Received orders matching `q` against branch name or receipt type.
pub async fn order_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::SearchQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let store = services.store.lock().await;
    let body: Vec<_> = store
        .order_history(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(dto::order_view)
        .collect();
    Json(body).into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let store = services.store.lock().await;
    if let Err(resp) = owned_order(&store, &actor, id) {
        return resp;
    }
    respond(store.order(id).cloned())
}

pub async fn request_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::RequestOrderRequest>,
) -> axum::response::Response {
    let branch = match authz::target_branch(&actor, body.branch_id) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let mut store = services.store.lock().await;
    match store.request_order(branch, body.receipt_type, body.quantity_units) {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_view(&order))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn edit_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::EditOrderRequest>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut store = services.store.lock().await;
    if let Err(resp) = owned_order(&store, &actor, id) {
        return resp;
    }
    respond(store.edit_request(id, body.receipt_type, body.quantity_units))
}

pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond(services.store.lock().await.approve_order(id))
}

/// Ship an approved order. The body is optional; `start_series` overrides the
/// automatically assigned range start.
pub async fn ship(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::ShipOrderRequest>>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();

    respond(services.store.lock().await.ship_order(id, body.start_series))
}

pub async fn mark_delivered(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond(services.store.lock().await.mark_delivered(id))
}

pub async fn confirm_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ConfirmReceiptRequest>,
) -> axum::response::Response {
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut store = services.store.lock().await;
    if let Err(resp) = owned_order(&store, &actor, id) {
        return resp;
    }
    respond(store.confirm_receipt(id, &body.received_by))
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    respond(services.store.lock().await.cancel_order(id))
}
