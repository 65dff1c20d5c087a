//! Storage backends for station snapshots
//!
//! This module provides a trait-based abstraction for persisting poll
//! batches to interchangeable backends.
//!
//! ## Design
//!
//! - **Trait-based**: `StationStore` lets the collector work with any backend
//! - **Async**: All operations are async for use inside the Tokio collector task
//! - **Batch-oriented**: One `save` call per poll cycle
//!
//! ## Backends
//!
//! - **File**: JSON array in a flat file
//! - **SQLite** (`storage-sqlite`): Embedded database file
//! - **MySQL** (`storage-mysql`): Remote database server
//! - **In-Memory**: No persistence, for dry runs and testing
//!
//! ## Usage
//!
//! ```no_run
//! use bikeshare_collector::config::StorageConfig;
//! use bikeshare_collector::storage::open_store;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = open_store(&StorageConfig::default())?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;
#[cfg(feature = "storage-mysql")]
pub mod mysql;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StationStore};
pub use error::{StorageError, StorageResult};

use crate::config::StorageConfig;

/// Build the backend selected by the configuration
///
/// Only configuration is checked here; connections are opened lazily by
/// each operation.
pub fn open_store(config: &StorageConfig) -> StorageResult<Box<dyn StationStore>> {
    match config {
        StorageConfig::None => Ok(Box::new(memory::MemoryStore::new())),
        StorageConfig::File { path } => Ok(Box::new(file::FileStore::new(path)?)),
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => Ok(Box::new(sqlite::SqliteStore::new(path)?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::InvalidConfig(
            "built without the storage-sqlite feature".to_string(),
        )),
        #[cfg(feature = "storage-mysql")]
        StorageConfig::Mysql(mysql_config) => {
            Ok(Box::new(mysql::MySqlStore::new(mysql_config)?))
        }
        #[cfg(not(feature = "storage-mysql"))]
        StorageConfig::Mysql(_) => Err(StorageError::InvalidConfig(
            "built without the storage-mysql feature".to_string(),
        )),
    }
}
