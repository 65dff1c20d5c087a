//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StationStore` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers are not blocked while a batch is written
//! - **Connection per operation**: Each `save`/`list` opens a connection and
//!   closes it before returning, so nothing is held between poll cycles
//! - **Self-initializing**: The table is created on first use

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Connection, Row};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StationStore};
use super::error::{StorageError, StorageResult};
use super::schema::{
    COUNT_SNAPSHOTS, INSERT_SNAPSHOT, SELECT_SNAPSHOTS, SQLITE_CREATE_TABLE, SnapshotRecord,
    TABLE_NAME,
};
use crate::station::StationSnapshot;

/// SQLite storage backend
///
/// Stores snapshots in a local SQLite database file.
pub struct SqliteStore {
    options: SqliteConnectOptions,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Create a new SQLite backend
    ///
    /// No file is touched here: the database file and its table are created
    /// by the first operation that connects.
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use bikeshare_collector::storage::sqlite::SqliteStore;
    /// let store = SqliteStore::new("./stations.db").unwrap();
    /// ```
    pub fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if db_path.as_os_str().is_empty() {
            return Err(StorageError::InvalidConfig(
                "SQLite database path is empty".to_string(),
            ));
        }

        info!("using SQLite backend at: {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        Ok(Self { options, db_path })
    }

    /// Open a connection and make sure the table exists
    async fn connect(&self) -> StorageResult<SqliteConnection> {
        let mut conn = SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        sqlx::query(SQLITE_CREATE_TABLE).execute(&mut conn).await?;

        Ok(conn)
    }
}

#[async_trait]
impl StationStore for SqliteStore {
    #[instrument(skip(self, batch), fields(count = batch.len()))]
    async fn save(&self, batch: &[StationSnapshot]) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        debug!("inserting {} snapshots into SQLite", batch.len());

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        for snapshot in batch {
            let record = SnapshotRecord::from(snapshot);

            sqlx::query(INSERT_SNAPSHOT)
                .bind(record.station_id)
                .bind(record.city)
                .bind(record.name)
                .bind(record.address)
                .bind(record.latitude)
                .bind(record.longitude)
                .bind(record.total_docks)
                .bind(record.available_bikes)
                .bind(record.available_docks)
                .bind(record.status)
                .bind(record.last_update)
                .bind(record.retrieved_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        conn.close().await?;

        debug!("batch insert complete");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> StorageResult<Vec<StationSnapshot>> {
        let mut conn = self.connect().await?;

        let records = sqlx::query_as::<_, SnapshotRecord>(SELECT_SNAPSHOTS)
            .fetch_all(&mut conn)
            .await?;

        conn.close().await?;

        debug!("query returned {} snapshots", records.len());
        records.into_iter().map(StationSnapshot::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let ping = async {
            let mut conn = self.connect().await?;
            sqlx::query("SELECT 1").fetch_one(&mut conn).await?;
            conn.close().await?;
            Ok::<_, StorageError>(())
        };

        match ping.await {
            Ok(()) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.display().to_string());
                metadata.insert("table".to_string(), TABLE_NAME.to_string());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let mut conn = self.connect().await?;

        let row = sqlx::query(COUNT_SNAPSHOTS).fetch_one(&mut conn).await?;
        let total_rows: i64 = row.try_get(0)?;

        conn.close().await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(format!(
            "SQLite: {} snapshots, {:.2} MB on disk",
            total_rows,
            file_size as f64 / 1_000_000.0
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing SQLite backend (no open connections)");
        Ok(())
    }
}
