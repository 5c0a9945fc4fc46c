pub mod memory;
pub mod sqlite;
pub mod types;

use crate::config::StoreConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;
pub use self::types::{AssetPatch, BulkOutcome, Program, Store, StoreResult};

/// Builds the store selected by `store.backend`.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    match config.backend.as_str() {
        "memory" => {
            info!("Using in-memory store; nothing will be persisted.");
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn Store>)
        }
        "sqlite" => {
            let store = SqliteStore::open(&config.sqlite_path)
                .with_context(|| format!("Failed to open SQLite store at {}", config.sqlite_path))?;
            Ok(Arc::new(store) as Arc<dyn Store>)
        }
        other => Err(anyhow::anyhow!("Unknown store backend: {}", other)),
    }
}
