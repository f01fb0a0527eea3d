use std::sync::Arc;

use guardian_agent::{build_llm_client, AgentContext, Orchestrator};
use guardian_alerting::AlertService;
use guardian_core::config::{AppConfig, ConfigError, LoadOptions};
use guardian_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub context: Arc<AgentContext>,
    pub orchestrator: Arc<Orchestrator>,
    pub alert_service: Arc<AlertService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg_attr(not(test), allow(dead_code))]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let context = Arc::new(AgentContext::from_pool(db_pool.clone(), &config));
    let orchestrator =
        Arc::new(Orchestrator::from_context(context.clone(), build_llm_client(&config.llm)));
    let alert_service = Arc::new(AlertService::from_pool(db_pool.clone(), &config));
    info!(
        event_name = "system.bootstrap.agents_ready",
        correlation_id = "bootstrap",
        mode = orchestrator.mode(),
        weather = context.weather.origin().as_str(),
        news = context.news.origin().as_str(),
        alert_channel = alert_service.notifier_channel(),
        "agents and alert service initialized"
    );

    Ok(Application { config, db_pool, context, orchestrator, alert_service })
}
