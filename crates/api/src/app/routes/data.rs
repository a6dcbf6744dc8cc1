use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use receiptdesk_infra::Table;
use receiptdesk_infra::export::export_csv;
use receiptdesk_infra::sync::{SyncError, apply_import};

use crate::app::services::AppServices;
use crate::app::errors;
use crate::authz;
use crate::context::ActorContext;

/// CSV export and remote table sync. Administrator only.
pub fn router() -> Router {
    Router::new()
        .route("/export/:table", get(export_table))
        .route("/sync/import", post(sync_import))
        .route("/sync/export", post(sync_export))
}

fn parse_table(raw: &str) -> Result<Table, axum::response::Response> {
    Table::ALL
        .into_iter()
        .find(|t| t.name() == raw)
        .ok_or_else(|| {
            errors::json_error(
                StatusCode::NOT_FOUND,
                "unknown_table",
                format!("unknown table: {raw}"),
            )
        })
}

pub async fn export_table(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(table): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let table = match parse_table(&table) {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    let snapshot = services.store.lock().await.snapshot();
    match export_csv(&snapshot, table) {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.csv\"", table.name()),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => errors::export_error_to_response(e),
    }
}

/// Pull every remote table and replace local collections. Nothing is applied
/// unless every fetch succeeds.
pub async fn sync_import(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let Some(sync) = services.sync.as_ref() else {
        return errors::sync_error_to_response(SyncError::NotConfigured);
    };

    let rows = match sync.fetch_all().await {
        Ok(rows) => rows,
        Err(e) => return errors::sync_error_to_response(e),
    };
    let report = {
        let mut store = services.store.lock().await;
        apply_import(&mut store, rows)
    };
    info!(tables = report.tables.len(), "remote import applied");
    Json(report).into_response()
}

pub async fn sync_export(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&actor) {
        return resp;
    }
    let Some(sync) = services.sync.as_ref() else {
        return errors::sync_error_to_response(SyncError::NotConfigured);
    };

    let snapshot = services.store.lock().await.snapshot();
    match sync.export_all(&snapshot).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::sync_error_to_response(e),
    }
}
