//! Role checks at the route boundary.
//!
//! Administrators may act on any branch; branch accounts only on their own.

use axum::http::StatusCode;
use axum::response::Response;

use receiptdesk_core::UserId;

use crate::app::errors::json_error;
use crate::context::ActorContext;

pub fn require_admin(actor: &ActorContext) -> Result<(), Response> {
    if actor.is_admin() {
        return Ok(());
    }
    Err(json_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        "administrator access required",
    ))
}

/// Branch filter for a read. Branch accounts always resolve to themselves and
/// may not name another branch; administrators may leave it open.
pub fn branch_filter(
    actor: &ActorContext,
    requested: Option<UserId>,
) -> Result<Option<UserId>, Response> {
    if actor.is_admin() {
        return Ok(requested);
    }
    match requested {
        Some(id) if id != actor.user_id() => Err(json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "branch accounts can only act on their own branch",
        )),
        _ => Ok(Some(actor.user_id())),
    }
}

/// Branch a write applies to. Administrators must name one.
pub fn target_branch(actor: &ActorContext, requested: Option<UserId>) -> Result<UserId, Response> {
    branch_filter(actor, requested)?.ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "branch_id is required",
        )
    })
}

/// Whether `actor` may act on something owned by `owner`.
pub fn require_owner_or_admin(actor: &ActorContext, owner: UserId) -> Result<(), Response> {
    if actor.is_admin() || actor.user_id() == owner {
        return Ok(());
    }
    Err(json_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        "this record belongs to another branch",
    ))
}
