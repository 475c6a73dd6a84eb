//! # carelink-api: Binary Entry Point
//!
//! Reads configuration from the environment, connects to PostgreSQL when
//! `DATABASE_URL` is set, migrates legacy evidence, and serves the API
//! until Ctrl-C.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use carelink_api::state::{AppConfig, AppState, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(?config, "configuration loaded");

    if config.metrics_enabled {
        carelink_api::middleware::metrics::init_metrics()
            .context("failed to install Prometheus recorder")?;
    }

    // Absent DATABASE_URL means in-memory stores.
    let db_pool = carelink_api::db::init_pool(&config).await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;
    if let Some(pool) = &db_pool {
        let report = carelink_api::db::disputes::migrate_legacy_evidence(pool)
            .await
            .context("legacy evidence migration failed")?;
        if !report.failed.is_empty() {
            tracing::warn!(
                failed = report.failed.len(),
                "some case documents could not be migrated and were left unchanged"
            );
        }
    }

    let port = config.port;
    let state = AppState::with_config(config, db_pool);
    let shutdown = state.shutdown.clone();
    let app = carelink_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("carelink API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "server exited");
            err
        })?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
