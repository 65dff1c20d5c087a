//! Station snapshot data model
//!
//! A [`StationSnapshot`] is the state of one bike-sharing station as seen by
//! one poll cycle. Snapshots are built from the raw API records returned by a
//! source and are never mutated afterwards.
//!
//! ## Serialized form
//!
//! Snapshots serialize with the camelCase keys used by the flat-file store:
//!
//! ```text
//! {"id": "1", "name": "Piazza Dante", "address": "...", "bikes": 4, "slots": 8,
//!  "totalSlots": 12, "latitude": 46.07, "longitude": 11.12, "status": "active",
//!  "lastUpdate": null, "timestamp": "2024-05-01T10:00:00Z", "city": "trento"}
//! ```

use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Point-in-time state of a single station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    /// Identifier assigned by the source
    #[serde(rename = "id")]
    pub station_id: String,

    pub name: String,

    #[serde(default)]
    pub address: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Number of docks installed at the station
    #[serde(rename = "totalSlots")]
    pub total_docks: u32,

    /// Bikes ready to be taken
    #[serde(rename = "bikes")]
    pub available_bikes: u32,

    /// Empty docks ready to receive a bike
    #[serde(rename = "slots")]
    pub available_docks: u32,

    pub status: StationStatus,

    /// When the source last refreshed this station, if it reports it
    #[serde(rename = "lastUpdate", default)]
    pub last_update: Option<DateTime<Utc>>,

    /// When this snapshot was retrieved (shared by the whole poll batch)
    #[serde(rename = "timestamp")]
    pub retrieved_at: DateTime<Utc>,

    /// Source the station was collected from
    pub city: String,
}

/// Operational status of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    Active,
    Inactive,
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationStatus::Active => write!(f, "active"),
            StationStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for StationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StationStatus::Active),
            "inactive" => Ok(StationStatus::Inactive),
            other => Err(format!("unknown station status '{other}'")),
        }
    }
}

/// A station record as returned by the bike-sharing API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStation {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub bikes: u32,
    pub slots: u32,
    pub total_slots: u32,
    /// `[latitude, longitude]`
    pub position: (f64, f64),
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_update: Option<DateTime<Utc>>,
}

impl ApiStation {
    /// Resolve the station status
    ///
    /// An explicit `status` string wins over the `active` flag. Without
    /// either, a station with no docks is considered inactive.
    pub fn resolve_status(&self) -> anyhow::Result<StationStatus> {
        if let Some(status) = &self.status {
            return status.parse().map_err(anyhow::Error::msg);
        }

        Ok(match self.active {
            Some(true) => StationStatus::Active,
            Some(false) => StationStatus::Inactive,
            None if self.total_slots == 0 => StationStatus::Inactive,
            None => StationStatus::Active,
        })
    }
}

impl StationSnapshot {
    /// Build a snapshot from a raw API record
    ///
    /// Timestamps are truncated to millisecond precision, which is what
    /// every storage backend can represent exactly.
    pub fn from_api(
        raw: ApiStation,
        city: &str,
        retrieved_at: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let status = raw
            .resolve_status()
            .with_context(|| format!("station {} has an invalid status", raw.id))?;
        let (latitude, longitude) = raw.position;

        Ok(Self {
            station_id: raw.id,
            name: raw.name,
            address: raw.address.unwrap_or_default(),
            latitude,
            longitude,
            total_docks: raw.total_slots,
            available_bikes: raw.bikes,
            available_docks: raw.slots,
            status,
            last_update: raw.last_update.map(|ts| ts.trunc_subsecs(3)),
            retrieved_at: retrieved_at.trunc_subsecs(3),
            city: city.to_string(),
        })
    }
}

/// Parse a source response body into snapshots
///
/// The body must be a JSON array of station records. One malformed record
/// rejects the whole response.
pub fn parse_stations(
    body: &str,
    city: &str,
    retrieved_at: DateTime<Utc>,
) -> anyhow::Result<Vec<StationSnapshot>> {
    let raw: Vec<ApiStation> =
        serde_json::from_str(body).context("failed to parse station list JSON")?;

    raw.into_iter()
        .map(|station| StationSnapshot::from_api(station, city, retrieved_at))
        .collect()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
