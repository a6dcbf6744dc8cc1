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
        .route("/", get(list_inventory))
        .route("/low-stock", get(low_stock))
        .route("/consumption", post(log_consumption))
}

/// Inventory entries. Branch accounts see their own; administrators may
/// filter by `branch_id` or search with `q`.
pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::BranchQuery>,
) -> axum::response::Response {
    let branch = match authz::branch_filter(&actor, query.branch_id) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let store = services.store.lock().await;
    let entries: Vec<_> = match query.q.as_deref() {
        Some(q) => store
            .search_inventory(q)
            .into_iter()
            .filter(|e| branch.is_none_or(|b| e.branch_id() == b))
            .collect(),
        None => store.list_inventory(branch),
    };
    let body: Vec<_> = entries.into_iter().map(dto::inventory_view).collect();
    Json(body).into_response()
}

pub async fn low_stock(
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
        .low_stock(branch)
        .into_iter()
        .map(dto::inventory_view)
        .collect();
    Json(body).into_response()
}

pub async fn log_consumption(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::LogConsumptionRequest>,
) -> axum::response::Response {
    let branch = match authz::target_branch(&actor, body.branch_id) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let mut store = services.store.lock().await;
    match store.log_consumption(
        branch,
        body.receipt_type,
        body.new_last_used,
        body.date,
        &body.logged_by,
    ) {
        Ok(entry) => Json(dto::inventory_view(&entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
