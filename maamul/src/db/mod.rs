//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │  Arc<dyn Store>
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - one file per table)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐       ┌─────────────┐
//! │   PgStore   │   or  │ MemoryStore │
//! └─────────────┘       └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository traits and their PostgreSQL implementations
//! - [`models`]: Record structures matching table schemas
//! - [`memory`]: In-memory backend with the same semantics
//! - [`errors`]: Database-specific error types
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and run on startup when an external database is configured:
//!
//! ```ignore
//! maamul::migrator().run(&pool).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::config::{Config, DatabaseConfig};
use crate::db::handlers::repository::Store;

pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;

pub use memory::MemoryStore;

/// PostgreSQL-backed [`Store`]. Repository impls live in [`handlers`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Open a pool against the configured database and bring the schema up to date.
pub async fn connect_pg(url: &str, config: &Config) -> anyhow::Result<PgPool> {
    let settings = match &config.database {
        DatabaseConfig::External { pool, .. } => pool.clone(),
        DatabaseConfig::Memory => Default::default(),
    };

    let seconds = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(seconds(settings.idle_timeout_secs))
        .max_lifetime(seconds(settings.max_lifetime_secs))
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    migrator().run(&pool).await.context("Failed to run database migrations")?;
    Ok(pool)
}

/// Build the storage backend selected by `database`.
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.database.external_url() {
        Some(url) => {
            info!("Using external PostgreSQL database");
            let pool = connect_pg(url, config).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            info!("Using in-memory storage; data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
