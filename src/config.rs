use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// JSON array in a flat file
    File {
        #[serde(default = "default_file_path")]
        path: PathBuf,
    },

    /// SQLite database file
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },

    /// Remote MySQL database
    Mysql(MySqlConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            path: default_file_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MySqlConfig {
    #[serde(default = "default_mysql_host")]
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub user: String,
    /// May also come from `BIKE_MYSQL_PASSWORD`
    #[serde(default)]
    pub password: Option<String>,
    pub database: String,
}

/// A city and the URL of its station list
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct SourceConfig {
    pub city: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Config {
    /// Seconds between poll cycles; `0` collects once and exits
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
            sources: default_sources(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Reject configurations the collector cannot start with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sources.is_empty() {
            bail!("at least one source must be configured");
        }

        for source in &self.sources {
            if source.city.trim().is_empty() {
                bail!("source {} has an empty city name", source.url);
            }

            let url = url::Url::parse(&source.url)
                .with_context(|| format!("invalid URL for source {}", source.city))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!(
                    "source {} must use http or https, got {}",
                    source.city,
                    url.scheme()
                );
            }
        }

        if self.timeout == 0 {
            bail!("timeout must be at least one second");
        }

        match &self.storage {
            StorageConfig::File { path } | StorageConfig::Sqlite { path }
                if path.as_os_str().is_empty() =>
            {
                bail!("storage path must not be empty")
            }
            StorageConfig::Mysql(mysql) if mysql.user.is_empty() || mysql.database.is_empty() => {
                bail!("mysql storage needs both a user and a database")
            }
            _ => Ok(()),
        }
    }

    /// Set the MySQL password when MySQL storage is configured
    pub fn with_mysql_password(mut self, password: Option<String>) -> Self {
        if let (StorageConfig::Mysql(mysql), Some(password)) = (&mut self.storage, password) {
            mysql.password = Some(password);
        }
        self
    }
}

fn default_file_path() -> PathBuf {
    PathBuf::from("./stations.json")
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./stations.db")
}

fn default_mysql_host() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_interval() -> u64 {
    300
}

fn default_timeout() -> u64 {
    30
}

const SOURCE_BASE_URL: &str = "https://os.smartcommunitylab.it/core.mobility/bikesharing";

fn default_sources() -> Vec<SourceConfig> {
    ["trento", "rovereto"]
        .into_iter()
        .map(|city| SourceConfig {
            city: city.to_string(),
            url: format!("{SOURCE_BASE_URL}/{city}"),
        })
        .collect()
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file {path}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
