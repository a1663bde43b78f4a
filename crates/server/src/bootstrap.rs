use std::sync::Arc;
use std::time::Duration;

use concierge_agent::gateway::{HttpGateway, ReservationGateway};
use concierge_agent::guardrails::GuardrailPolicy;
use concierge_agent::llm::build_client;
use concierge_agent::runtime::{ChatSettings, ConciergeRuntime};
use concierge_core::config::{AppConfig, ConfigError, GatewayMode, LoadOptions};
use concierge_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::ApiState;
use crate::gateway::{DbCatalog, InProcessGateway};
use crate::reservations::ReservationService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("LLM client setup failed: {0}")]
    Llm(String),
    #[error("reservation gateway setup failed: {0}")]
    Gateway(String),
    #[error("prompt template failed to load: {0}")]
    Prompt(String),
}

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

    let db_pool = connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let llm = build_client(&config.llm).map_err(|error| BootstrapError::Llm(format!("{error:#}")))?;

    let reservations = Arc::new(ReservationService::from_pool(&db_pool));
    let gateway: Arc<dyn ReservationGateway> = match config.chat.gateway {
        GatewayMode::InProcess => Arc::new(InProcessGateway::new(reservations.clone())),
        GatewayMode::Http => {
            let base_url = config.gateway_base_url();
            info!(
                event_name = "system.bootstrap.http_gateway",
                correlation_id = "bootstrap",
                base_url = %base_url,
                "chat directives will call the reservation API over HTTP"
            );
            Arc::new(
                HttpGateway::new(&base_url, Duration::from_secs(config.llm.timeout_secs))
                    .map_err(|error| BootstrapError::Gateway(error.to_string()))?,
            )
        }
    };

    let guardrails = GuardrailPolicy { chat_bookings_enabled: config.chat.bookings_enabled };
    let concierge = ConciergeRuntime::new(
        llm,
        Arc::new(DbCatalog::from_pool(&db_pool)),
        gateway,
        guardrails,
        ChatSettings::from(&config.chat),
    )
    .map_err(|error| BootstrapError::Prompt(error.to_string()))?;
    if !concierge.is_configured() {
        warn!(
            event_name = "system.bootstrap.llm_unconfigured",
            correlation_id = "bootstrap",
            provider = ?config.llm.provider,
            "no LLM API key configured; /chat will report the missing key"
        );
    }

    Ok(Application {
        config,
        db_pool,
        state: ApiState { reservations, concierge: Arc::new(concierge) },
    })
}

#[cfg(test)]
mod tests {
    use concierge_core::config::{ConfigOverrides, GatewayMode, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                llm_api_key: Some("test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_the_runtime() {
        let app = bootstrap(options("sqlite::memory:")).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table' AND name IN ('users', 'rooms', 'bookings', 'spa_services', 'spa_appointments', 'activities')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 6);
        assert!(app.state.concierge.is_configured());

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn http_gateway_mode_boots() {
        let mut options = options("sqlite::memory:");
        options.overrides.chat_gateway = Some(GatewayMode::Http);

        let app = bootstrap(options).await.expect("bootstrap should succeed");
        assert_eq!(app.config.chat.gateway, GatewayMode::Http);
    }

    #[tokio::test]
    async fn non_sqlite_database_fails_fast() {
        let result = bootstrap(options("postgres://localhost/resort")).await;
        assert!(matches!(result, Err(BootstrapError::Config(_))));
    }
}
