use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_warehouse))
        .route("/replenish", post(replenish))
        .route("/adjust", post(adjust))
}

/// Warehouse allocation of one branch, or of every branch for administrators
/// without a `branch_id`.
pub async fn list_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::BranchQuery>,
) -> axum::response::Response {
    let branch = match authz::branch_filter(&actor, query.branch_id) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let store = services.store.lock().await;
    let items: Vec<_> = match branch {
        Some(b) => store.warehouse_for(b).into_iter().map(dto::warehouse_view).collect(),
        None => store.warehouse_items().map(dto::warehouse_view).collect(),
    };
    Json(items).into_response()
}

pub async fn replenish(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::ReplenishRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let mut store = services.store.lock().await;
    match store.replenish_warehouse(body.branch_id, body.receipt_type, body.units) {
        Ok(item) => Json(dto::warehouse_view(&item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn adjust(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::AdjustWarehouseRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let mut store = services.store.lock().await;
    match store.adjust_warehouse(body.branch_id, body.receipt_type, body.delta) {
        Ok(item) => Json(dto::warehouse_view(&item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
