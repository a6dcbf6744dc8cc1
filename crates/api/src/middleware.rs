use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app::services::AppServices;
use crate::context::ActorContext;

pub const ACTOR_HEADER: &str = "x-receiptdesk-user";

/// Resolve the acting account from [`ACTOR_HEADER`]; unknown users get 401.
pub async fn actor_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let username = extract_username(req.headers())?;

    let actor = {
        let store = services.store.lock().await;
        let user = store
            .authenticate(username)
            .map_err(|_e| StatusCode::UNAUTHORIZED)?;
        ActorContext::from_user(user)
    };

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn extract_username(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers.get(ACTOR_HEADER).ok_or(StatusCode::UNAUTHORIZED)?;
    let username = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?.trim();
    if username.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(username)
}
