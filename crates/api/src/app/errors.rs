use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::warn;

use receiptdesk_core::DomainError;
use receiptdesk_infra::export::ExportError;
use receiptdesk_infra::sync::SyncError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Precondition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "precondition_failed", msg)
        }
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn sync_error_to_response(err: SyncError) -> axum::response::Response {
    warn!(error = %err, "remote sync failed");
    match err {
        SyncError::NotConfigured => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "sync_disabled",
            err.to_string(),
        ),
        other => json_error(StatusCode::BAD_GATEWAY, "sync_error", other.to_string()),
    }
}

pub fn export_error_to_response(err: ExportError) -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "export_error",
        err.to_string(),
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path/query identifier, mapping failures to a 400 response.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}
