mod api;
mod bootstrap;
mod health;
mod identity;

use anyhow::Result;
use partflow_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use partflow_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = api::router(app.db_pool.clone(), app.identity.clone())
        .merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "partflow-server started"
    );

    let grace = std::time::Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (signal_tx, mut signal_rx) = tokio::sync::watch::channel(());
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = signal_rx.changed().await;
            })
            .await
    });

    wait_for_shutdown().await;
    let _ = signal_tx.send(());
    tracing::info!(
        event_name = "system.server.stopping",
        grace_secs = grace.as_secs(),
        "partflow-server draining in-flight requests"
    );

    match tokio::time::timeout(grace, server).await {
        Ok(result) => result??,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                "drain window elapsed before connections closed"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            event_name = "system.server.signal_error",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
