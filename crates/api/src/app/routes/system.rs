use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::dto;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::ActorContext;

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(actor): Extension<ActorContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": actor.user_id().to_string(),
        "username": actor.username(),
        "role": actor.role(),
        "branch_name": actor.branch_name(),
    }))
}

/// Most recent journal entries, newest first.
pub async fn activity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::ActivityQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let store = services.store.lock().await;
    let entries: Vec<_> = store.recent_activity(limit).into_iter().cloned().collect();
    Json(entries).into_response()
}
