use std::sync::Arc;

use anyhow::Context;

use receiptdesk_api::app::{build_app, services::AppServices};
use receiptdesk_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = AppConfig::load().context("failed to load configuration")?;
    receiptdesk_observability::init_with(config.logging.format, &config.logging.filter);

    let services = AppServices::from_config(&config).context("failed to build services")?;
    let app = build_app(Arc::new(services));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, environment = %config.environment, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
