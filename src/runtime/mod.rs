//! Runtime wiring
//!
//! Loads configuration and opens the services over the SQLite store.

pub mod config;
pub mod loader;

use anyhow::{Context, Result};
use guildhall_core::GuildHall;
use guildhall_store::SqliteStore;
use std::sync::Arc;
use tracing::info;

pub use self::config::AppConfig;
pub use loader::load_config;

/// Open services and their store
pub struct Runtime {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub hall: GuildHall,
}

impl Runtime {
    /// Load configuration and open the database it points at
    pub async fn start() -> Result<Self> {
        let config = load_config()?;
        Self::open(config).await
    }

    /// Open the database named by `config`
    pub async fn open(config: AppConfig) -> Result<Self> {
        let path = config.database_path();
        let store = SqliteStore::from_path(&path)
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let store = Arc::new(store);
        let hall = GuildHall::try_new(store.clone(), config.economy())
            .context("Invalid economy configuration")?;

        info!(database = %path.display(), "Guild services ready");
        Ok(Self {
            config,
            store,
            hall,
        })
    }
}
