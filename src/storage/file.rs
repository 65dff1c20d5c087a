//! Flat-file storage backend
//!
//! Snapshots are kept in a single pretty-printed JSON array. Every `save`
//! reads the array, appends the batch and rewrites the file through a
//! sibling temporary file that is renamed into place, so a crash mid-write
//! leaves the previous contents intact.
//!
//! A missing file is created as an empty array `[]` when the store is
//! opened, or on the next `save` if its directory did not exist yet.
//!
//! ## Limitations
//!
//! - **Whole-file rewrite**: Cost grows with the history size
//! - **Single writer**: Writers in other processes are not coordinated

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StationStore};
use super::error::{StorageError, StorageResult};
use crate::station::StationSnapshot;

/// JSON-array file backend
pub struct FileStore {
    path: PathBuf,

    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the backend, creating `[]` at `path` when nothing is there
    ///
    /// A path whose directory is missing is accepted; writes fail until
    /// the directory exists.
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if path.as_os_str().is_empty() {
            return Err(StorageError::InvalidConfig(
                "snapshot file path is empty".to_string(),
            ));
        }

        info!("using file backend at: {}", path.display());

        if !path.exists() {
            match std::fs::write(&path, "[]") {
                Ok(()) => debug!("created empty snapshot file"),
                Err(e) => warn!("could not create {}: {}", path.display(), e),
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Read the stored array; a missing file holds no snapshots
    async fn read_all(&self) -> StorageResult<Vec<StationSnapshot>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&content).map_err(|e| {
            StorageError::SerializationError(format!(
                "failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn write_all(&self, snapshots: &[StationSnapshot]) -> StorageResult<()> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        snapshots.serialize(&mut serializer)?;

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &buffer).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[async_trait]
impl StationStore for FileStore {
    #[instrument(skip(self, batch), fields(count = batch.len(), path = %self.path.display()))]
    async fn save(&self, batch: &[StationSnapshot]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;

        if batch.is_empty() {
            if !tokio::fs::try_exists(&self.path).await? {
                self.write_all(&[]).await?;
            }
            return Ok(());
        }

        let mut snapshots = self.read_all().await?;
        let previous = snapshots.len();
        snapshots.extend_from_slice(batch);

        self.write_all(&snapshots).await?;

        debug!(
            "appended {} snapshots ({} stored before)",
            batch.len(),
            previous
        );
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn list(&self) -> StorageResult<Vec<StationSnapshot>> {
        let snapshots = self.read_all().await?;
        debug!("read {} snapshots", snapshots.len());
        Ok(snapshots)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let dir = self.parent_dir();

        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Ok(HealthStatus {
                healthy: true,
                message: "file backend operational".to_string(),
                metadata: HashMap::from([
                    ("backend".to_string(), "file".to_string()),
                    ("path".to_string(), self.path.display().to_string()),
                ]),
            }),
            Ok(_) => Ok(HealthStatus {
                healthy: false,
                message: format!("{} is not a writable directory", dir.display()),
                metadata: HashMap::new(),
            }),
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

    async fn get_stats(&self) -> StorageResult<String> {
        let count = self.read_all().await?.len();
        let size = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(format!(
            "File: {} snapshots, {:.2} MB on disk",
            count,
            size as f64 / 1_000_000.0
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}
