mod api;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use guardian_alerting::Poller;
use guardian_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use guardian_core::config::LogFormat::*;
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
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let poller = app.config.alerting.poller_enabled.then(|| {
        let poller = Poller::new(
            app.alert_service.clone(),
            Duration::from_secs(app.config.alerting.poll_interval_secs),
        );
        let shutdown = poller.shutdown_handle();
        (shutdown, poller.start())
    });

    let router = api::router(api::ApiState {
        context: app.context.clone(),
        orchestrator: app.orchestrator.clone(),
        alerts: app.alert_service.clone(),
    })
    .merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        mode = app.orchestrator.mode(),
        poller_enabled = poller.is_some(),
        "guardian-server listening"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "guardian-server stopping"
    );

    if let Some((shutdown, handle)) = poller {
        shutdown.notify_one();
        let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!(
                event_name = "system.server.poller_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "alert poller did not stop within the grace period"
            );
        }
    }
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
