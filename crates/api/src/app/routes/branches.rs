use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};

use receiptdesk_core::UserId;
use receiptdesk_infra::{BranchPatch, NewBranch};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_branches).post(register_branch))
        .route("/:id", patch(update_branch).delete(delete_branch))
}

pub async fn list_branches(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let store = services.store.lock().await;
    let branches: Vec<_> = store.list_branches().into_iter().map(dto::user_view).collect();
    Json(branches).into_response()
}

pub async fn register_branch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::RegisterBranchRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }

    let mut store = services.store.lock().await;
    match store.register_branch(NewBranch {
        username: body.username,
        branch_name: body.branch_name,
        company: body.company,
        tin_number: body.tin_number,
    }) {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_view(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_branch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateBranchRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let id: UserId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let patch = BranchPatch {
        username: body.username,
        branch_name: body.branch_name,
        company: body.company,
        tin_number: body.tin_number,
    };

    let mut store = services.store.lock().await;
    match store.update_branch(id, patch) {
        Ok(user) => Json(dto::user_view(&user)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Removes the branch together with its inventory, warehouse allocation and orders.
pub async fn delete_branch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let id: UserId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut store = services.store.lock().await;
    match store.delete_branch(id) {
        Ok(removal) => Json(removal).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
