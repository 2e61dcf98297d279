mod api;
mod bootstrap;
mod health;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use orderdesk_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use orderdesk_core::config::LogFormat::*;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let server = &app.config.server;
    let address = format!("{}:{}", server.bind_address, server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let routes = api::router(app.runtime.clone()).merge(health::router(app.db_pool.clone()));
    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let serving = tokio::spawn(
        axum::serve(listener, routes)
            .with_graceful_shutdown(async move { signal.notified().await })
            .into_future(),
    );

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "orderdesk-server listening"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        grace_secs = server.graceful_shutdown_secs,
        "orderdesk-server draining connections"
    );

    shutdown.notify_one();
    match tokio::time::timeout(Duration::from_secs(server.graceful_shutdown_secs), serving).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.drain_timeout",
            "in-flight requests did not finish before the grace period"
        ),
    }

    if let Some(pool) = &app.db_pool {
        pool.close().await;
    }
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
