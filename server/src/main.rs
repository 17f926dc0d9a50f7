use anyhow::Context;
use recipes_server::api::{self, AppState};
use recipes_server::config::Config;
use recipes_server::db;
use recipes_server::store::DbRecipeStore;
use recipes_server::telemetry;
use std::sync::Arc;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    let telemetry = telemetry::init_telemetry().context("failed to initialize telemetry")?;

    let config = Config::from_env().context("invalid configuration")?;

    let pool = tokio::task::spawn_blocking({
        let config = config.clone();
        move || db::create_pool(&config)
    })
    .await?
    .context("failed to set up database")?;
    tracing::info!(pool_size = config.pool_size, "database ready");

    let state = AppState::new(Arc::new(DbRecipeStore::new(pool)), config.operation_timeout);

    let app = telemetry::with_http_tracing(api::router(state));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    telemetry.shutdown();
    Ok(())
}
