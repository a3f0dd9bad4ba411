//! Event log API server entry point.

use std::error::Error;
use std::sync::Arc;

use eventlog_api::config::AppConfig;
use eventlog_api::state::AppState;
use eventlog_api::{app, telemetry};
use eventlog_postgres::{MIGRATOR, PgRecordRepository};
use eventlog_store::EventStore;
use sqlx::postgres::PgPoolOptions;
use tokio::runtime::Handle;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting event log API server");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let event_store =
        EventStore::new(Arc::new(PgRecordRepository::new(pool))).with_executor(Handle::current());
    let app = app(AppState::new(event_store));

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    telemetry.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
