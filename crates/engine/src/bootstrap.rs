use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use procura_core::config::{AppConfig, ConfigError, LoadOptions};
use procura_core::directory::{ApproverDirectory, IdentityProvider};
use procura_core::events::EventSink;
use procura_db::{connect_with_config, migrations, DbPool, SqlLedgerStore, SqlSupplierDirectory};

use crate::context::EngineContext;
use crate::procurement::ProcurementEngine;

/// A configured, migrated database ready to back an engine.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
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
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting procurement engine bootstrap"
    );
    let config = AppConfig::load(options)?;

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    Ok(Application { config, db_pool })
}

impl Application {
    /// Builds an engine over the SQLite ledger and supplier table. Identity
    /// and approver routing stay pluggable.
    pub fn engine(
        &self,
        identity: Arc<dyn IdentityProvider>,
        approvers: Arc<dyn ApproverDirectory>,
        events: Arc<dyn EventSink>,
    ) -> ProcurementEngine {
        let ctx = EngineContext::new(
            Arc::new(SqlLedgerStore::new(self.db_pool.clone())),
            identity,
            Arc::new(SqlSupplierDirectory::new(self.db_pool.clone())),
            approvers,
            events,
        )
        .with_ledger_timeout(Duration::from_millis(self.config.ledger.operation_timeout_ms));

        ProcurementEngine::from_config(ctx, &self.config.scoring)
    }

    pub fn suppliers(&self) -> SqlSupplierDirectory {
        SqlSupplierDirectory::new(self.db_pool.clone())
    }
}
