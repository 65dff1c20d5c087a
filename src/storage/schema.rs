//! Table layout shared by the SQL backends
//!
//! SQLite and MySQL store snapshots in the same `station_snapshots` table.
//! Only the DDL differs between the two dialects; the column set, the
//! insert statement and the row mapping are shared.
//!
//! ## Ordering
//!
//! `seq` is an auto-increment key. Batches are inserted in order inside one
//! transaction, so `ORDER BY seq` yields snapshots in the order they were
//! saved, which is what the file backend returns as well.
//!
//! ## Timestamps
//!
//! Timestamps are stored as Unix milliseconds (`BIGINT`). Snapshots carry
//! millisecond precision, so the conversion is lossless.

use chrono::{DateTime, Utc};

use super::error::{StorageError, StorageResult};
use crate::station::{StationSnapshot, StationStatus};

pub const TABLE_NAME: &str = "station_snapshots";

#[cfg(feature = "storage-sqlite")]
pub const SQLITE_CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS station_snapshots (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    station_id      TEXT    NOT NULL,
    city            TEXT    NOT NULL,
    name            TEXT    NOT NULL,
    address         TEXT    NOT NULL,
    latitude        REAL    NOT NULL,
    longitude       REAL    NOT NULL,
    total_docks     INTEGER NOT NULL,
    available_bikes INTEGER NOT NULL,
    available_docks INTEGER NOT NULL,
    status          TEXT    NOT NULL,
    last_update     INTEGER,
    retrieved_at    INTEGER NOT NULL
)
"#;

#[cfg(feature = "storage-mysql")]
pub const MYSQL_CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS station_snapshots (
    seq             BIGINT      NOT NULL AUTO_INCREMENT PRIMARY KEY,
    station_id      TEXT        NOT NULL,
    city            TEXT        NOT NULL,
    name            TEXT        NOT NULL,
    address         TEXT        NOT NULL,
    latitude        DOUBLE      NOT NULL,
    longitude       DOUBLE      NOT NULL,
    total_docks     BIGINT      NOT NULL,
    available_bikes BIGINT      NOT NULL,
    available_docks BIGINT      NOT NULL,
    status          VARCHAR(16) NOT NULL,
    last_update     BIGINT      NULL,
    retrieved_at    BIGINT      NOT NULL,
    INDEX idx_station_snapshots_station (city(64), station_id(64), retrieved_at)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

#[cfg(feature = "storage-mysql")]
pub const MYSQL_TABLE_EXISTS: &str = r#"
SELECT COUNT(*) FROM information_schema.tables
WHERE table_schema = DATABASE() AND table_name = ?
"#;

/// Placeholders are `?` in both SQLite and MySQL
pub const INSERT_SNAPSHOT: &str = r#"
INSERT INTO station_snapshots (
    station_id, city, name, address, latitude, longitude,
    total_docks, available_bikes, available_docks, status,
    last_update, retrieved_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

pub const SELECT_SNAPSHOTS: &str = r#"
SELECT station_id, city, name, address, latitude, longitude,
       total_docks, available_bikes, available_docks, status,
       last_update, retrieved_at
FROM station_snapshots
ORDER BY seq ASC
"#;

pub const COUNT_SNAPSHOTS: &str = "SELECT COUNT(*) FROM station_snapshots";

/// One row of `station_snapshots`, in column types both dialects decode
#[derive(Debug, Clone)]
#[cfg_attr(
    any(feature = "storage-sqlite", feature = "storage-mysql"),
    derive(sqlx::FromRow)
)]
pub struct SnapshotRecord {
    pub station_id: String,
    pub city: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_docks: i64,
    pub available_bikes: i64,
    pub available_docks: i64,
    pub status: String,
    pub last_update: Option<i64>,
    pub retrieved_at: i64,
}

impl From<&StationSnapshot> for SnapshotRecord {
    fn from(snapshot: &StationSnapshot) -> Self {
        Self {
            station_id: snapshot.station_id.clone(),
            city: snapshot.city.clone(),
            name: snapshot.name.clone(),
            address: snapshot.address.clone(),
            latitude: snapshot.latitude,
            longitude: snapshot.longitude,
            total_docks: i64::from(snapshot.total_docks),
            available_bikes: i64::from(snapshot.available_bikes),
            available_docks: i64::from(snapshot.available_docks),
            status: snapshot.status.to_string(),
            last_update: snapshot.last_update.as_ref().map(timestamp_to_millis),
            retrieved_at: timestamp_to_millis(&snapshot.retrieved_at),
        }
    }
}

impl TryFrom<SnapshotRecord> for StationSnapshot {
    type Error = StorageError;

    fn try_from(record: SnapshotRecord) -> StorageResult<Self> {
        let status: StationStatus = record
            .status
            .parse()
            .map_err(StorageError::SerializationError)?;

        Ok(Self {
            total_docks: count_from_column("total_docks", record.total_docks)?,
            available_bikes: count_from_column("available_bikes", record.available_bikes)?,
            available_docks: count_from_column("available_docks", record.available_docks)?,
            last_update: record.last_update.map(millis_to_timestamp).transpose()?,
            retrieved_at: millis_to_timestamp(record.retrieved_at)?,
            station_id: record.station_id,
            city: record.city,
            name: record.name,
            address: record.address,
            latitude: record.latitude,
            longitude: record.longitude,
            status,
        })
    }
}

/// Convert a timestamp to Unix milliseconds for storage
pub fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Convert stored Unix milliseconds back to a timestamp
pub fn millis_to_timestamp(millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        StorageError::SerializationError(format!("timestamp {millis} is out of range"))
    })
}

fn count_from_column(column: &str, value: i64) -> StorageResult<u32> {
    u32::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!("{column} value {value} is out of range"))
    })
}
