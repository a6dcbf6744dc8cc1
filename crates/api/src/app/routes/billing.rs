use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;
use crate::app::dto;
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/", get(billing_archive))
}

/// Delivered supplier orders with billing totals. `q` matches invoice,
/// delivery receipt, PRF number or branch name.
pub async fn billing_archive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::SearchQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let store = services.store.lock().await;
    let q = query.q.as_deref();
    let view = dto::BillingView {
        summary: store.billing_summary(q),
        orders: store
            .billing_archive(q)
            .into_iter()
            .map(dto::supplier_order_view)
            .collect(),
    };
    Json(view).into_response()
}
