//! Application state shared by every handler

use clubhub_app::{ClubService, Directory};
use tracing::info;

use crate::{WebConfig, WebError, WebResult};

/// Shared state: the configuration and the guarded club operations.
/// Cloning is cheap, every clone shares the same sqlite pool.
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: WebConfig,
    /// Guarded club operations
    pub service: ClubService,
}

impl AppState {
    /// Create application state: open the directory, ensure the schema,
    /// and seed the default categories and admin account.
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let directory = if config.database_url.contains(":memory:") {
            Directory::in_memory()
                .await
                .map_err(|e| WebError::Database(e.to_string()))?
        } else {
            Directory::connect(&config.database_url)
                .await
                .map_err(|e| WebError::Database(e.to_string()))?
        };

        let service = ClubService::new(directory);
        service
            .directory()
            .create_tables()
            .await
            .map_err(|e| WebError::Database(e.to_string()))?;
        service
            .directory()
            .seed_defaults()
            .await
            .map_err(|e| WebError::Database(e.to_string()))?;

        info!("Application state initialized");
        Ok(Self { config, service })
    }

    /// In-memory state for tests
    pub async fn in_memory() -> WebResult<Self> {
        let config = WebConfig {
            database_url: "sqlite::memory:".to_string(),
            ..WebConfig::default()
        };
        Self::new(config).await
    }
}
