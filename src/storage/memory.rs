//! In-memory storage backend (no persistence)
//!
//! Keeps every saved snapshot in a vector behind a lock. Useful for:
//! - Dry runs that exercise the fetcher without writing anything
//! - Tests that need a store without files or a database server
//!
//! All data is lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StationStore};
use super::error::StorageResult;
use crate::station::StationSnapshot;

/// In-memory storage backend
#[derive(Default)]
pub struct MemoryStore {
    snapshots: RwLock<Vec<StationSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StationStore for MemoryStore {
    async fn save(&self, batch: &[StationSnapshot]) -> StorageResult<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.extend_from_slice(batch);
        debug!("in-memory backend holds {} snapshots", snapshots.len());
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<StationSnapshot>> {
        Ok(self.snapshots.read().await.clone())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                (
                    "total_snapshots".to_string(),
                    self.snapshots.read().await.len().to_string(),
                ),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        Ok(format!(
            "In-Memory: {} snapshots",
            self.snapshots.read().await.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
