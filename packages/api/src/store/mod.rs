//! Store backend selection
//!
//! | Backend | Persistence | Best For |
//! |---------|-------------|----------|
//! | PostgreSQL | Durable | Production, docker-compose |
//! | Memory | Process lifetime | Local development, tests |
//!
//! ```bash
//! STORE_BACKEND=postgres  # postgres, memory
//! DATABASE_URL=postgres://...
//! ```

mod postgres;

pub use postgres::PostgresStore;

use std::{sync::Arc, time::Duration};

use antimatter::store::{InMemoryStore, Store, StoreError};
use sea_orm::{ConnectOptions, Database};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn from_env() -> Self {
        match std::env::var("STORE_BACKEND")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "memory" | "in-memory" | "inmemory" => Self::Memory,
            _ => Self::Postgres,
        }
    }
}

/// Create the store selected by `STORE_BACKEND`.
pub async fn create_store() -> Result<Arc<dyn Store>, StoreError> {
    match StoreBackend::from_env() {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, nothing will survive a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let db_url = std::env::var("DATABASE_URL").map_err(|_| {
                StoreError::Configuration("DATABASE_URL must be set for the Postgres store".into())
            })?;

            let mut opt = ConnectOptions::new(db_url);
            opt.max_connections(10)
                .min_connections(1)
                .connect_timeout(Duration::from_secs(8))
                .sqlx_logging(false);

            let db = Database::connect(opt)
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;

            let store = PostgresStore::new(Arc::new(db));
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}
