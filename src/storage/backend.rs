//! Storage backend trait definition
//!
//! This module defines the `StationStore` trait that every storage
//! backend implements.

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::StorageResult;
use crate::station::StationSnapshot;

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for snapshot storage backends
///
/// The file, SQLite, MySQL and in-memory backends all implement this
/// trait and are interchangeable: given the same sequence of `save`
/// calls, `list` returns the same snapshots in the same order on every
/// backend.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so the collector task can own
/// them as `Box<dyn StationStore>`.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>`. Implementations convert
/// backend-specific errors into `StorageError` variants.
#[async_trait]
pub trait StationStore: Send + Sync {
    /// Persist one poll batch
    ///
    /// The batch is written atomically where the backend allows it: either
    /// every snapshot is stored or none is. Saving an empty batch is a no-op.
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use bikeshare_collector::{station::StationSnapshot, storage::StationStore};
    /// # async fn example(store: &dyn StationStore, batch: Vec<StationSnapshot>) {
    /// store.save(&batch).await.expect("save failed");
    /// # }
    /// ```
    async fn save(&self, batch: &[StationSnapshot]) -> StorageResult<()>;

    /// Every stored snapshot, oldest batch first, in the order it was saved
    async fn list(&self) -> StorageResult<Vec<StationSnapshot>>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend is reachable
    /// (open a connection, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Get backend-specific statistics
    ///
    /// Returns a human-readable summary (e.g., "SQLite: 1200 snapshots").
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
