//! HTTP fetcher for the bike-sharing API
//!
//! A [`StationFetcher`] requests the station list of every configured
//! source and turns the responses into one batch of snapshots. The HTTP
//! client is built once and reused for every cycle.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, trace};

use crate::config::{Config, SourceConfig};
use crate::station::{StationSnapshot, parse_stations};

pub struct StationFetcher {
    client: reqwest::Client,
    sources: Vec<SourceConfig>,
}

impl StationFetcher {
    pub fn new(sources: Vec<SourceConfig>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, sources })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.sources.clone(), Duration::from_secs(config.timeout))
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Fetch every source and return the combined batch
    ///
    /// All snapshots share `retrieved_at`. The batch is all-or-nothing: the
    /// first failing source fails the whole fetch.
    #[instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn fetch(&self, retrieved_at: DateTime<Utc>) -> Result<Vec<StationSnapshot>> {
        let mut batch = Vec::new();

        for source in &self.sources {
            debug!("collecting updated data for city [{}]", source.city);

            let stations = self
                .fetch_source(source, retrieved_at)
                .await
                .with_context(|| format!("failed to collect city [{}]", source.city))?;

            trace!("{} stations from {}", stations.len(), source.city);
            batch.extend(stations);
        }

        Ok(batch)
    }

    async fn fetch_source(
        &self,
        source: &SourceConfig,
        retrieved_at: DateTime<Utc>,
    ) -> Result<Vec<StationSnapshot>> {
        trace!("requesting stations from {}", source.url);

        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .context("failed to send HTTP request")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("failed to read response body")?;

        parse_stations(&body, &source.city, retrieved_at)
    }
}
