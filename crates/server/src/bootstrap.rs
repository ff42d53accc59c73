use partflow_core::config::{AppConfig, ConfigError, LoadOptions};
use partflow_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::identity::IdentityResolver;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub identity: IdentityResolver,
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

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let identity = IdentityResolver::from_config(&config);
    if config.demo_auth_enabled() {
        info!(event_name = "system.bootstrap.demo_auth", "demo bearer-token auth enabled");
    }

    Ok(Application { config, db_pool, identity })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use partflow_core::config::{ConfigOverrides, LoadOptions};
    use partflow_core::domain::request::{RequestPayload, RequestStatus};
    use partflow_core::workflow::engine::{WorkflowAction, WorkflowEngine};
    use partflow_db::repositories::{RequestRepository, SqlRequestRepository};

    use crate::bootstrap::bootstrap;

    fn memory_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_database_urls() {
        let result = bootstrap(memory_overrides("postgres://localhost/partflow")).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_the_request_data_path() {
        let app = bootstrap(memory_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name = 'modification_request'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected foundation table to be available after bootstrap");
        assert_eq!(table_count, 1, "bootstrap should expose the request table");

        let repo = SqlRequestRepository::new(app.db_pool.clone());
        let engine = WorkflowEngine;

        let payload = RequestPayload {
            plant: Some("1000".to_string()),
            part_code: Some("P-INT-0001".to_string()),
            ..RequestPayload::default()
        };
        let request = engine.create(payload, None, "creator@demo.local", Utc::now());
        repo.insert(request.clone()).await.expect("insert should succeed");

        let approved = engine
            .approver_act(&request, WorkflowAction::Approve, None, "approver@demo.local", Utc::now())
            .expect("pending -> approved should succeed");
        let applied = repo
            .update_guarded(approved.clone(), RequestStatus::PendingForApproval)
            .await
            .expect("guarded update should succeed");
        assert!(applied, "guard should match the stored status");

        let stored = repo
            .find_by_id(&request.id)
            .await
            .expect("lookup should succeed")
            .expect("request should exist");
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.approved_by.as_deref(), Some("approver@demo.local"));

        app.db_pool.close().await;
    }
}
