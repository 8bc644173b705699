//! TOML configuration for the watcher.
//!
//! Every section is optional except `[source]`, which must name a `url`.
//! Locations may be `http(s)://` URLs, `file://` URLs or plain paths.

use buzzwatch_core::data::{
    DataSource, FetchError, FileSource, HttpOptions, HttpSource, MAX_RETRIES,
};
use buzzwatch_core::{DatasetLoader, SignalParams, TableLayout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to build source '{location}': {error}")]
    Source {
        location: String,
        #[source]
        error: FetchError,
    },
}

/// Complete watcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub signals: SignalParams,
    #[serde(default)]
    pub alert: AlertConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Price dataset location.
    pub url: String,
    /// Optional per-day volume dataset location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_volume_column")]
    pub volume_column: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            id_column: default_id_column(),
            volume_column: default_volume_column(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Spool directory for rendered alerts. Absent: alerts go to the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    concat!("buzzwatch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_id_column() -> String {
    buzzwatch_core::data::parse::DEFAULT_ID_COLUMN.to_string()
}

fn default_volume_column() -> String {
    buzzwatch_core::data::parse::DEFAULT_VOLUME_COLUMN.to_string()
}

fn default_interval_secs() -> u64 {
    300
}

impl WatchConfig {
    /// A config with defaults everywhere and the given price location.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            source: SourceConfig {
                url: url.into(),
                volume_url: None,
                timeout_secs: default_timeout_secs(),
                max_retries: default_max_retries(),
                user_agent: default_user_agent(),
            },
            table: TableConfig::default(),
            refresh: RefreshConfig::default(),
            signals: SignalParams::default(),
            alert: AlertConfig::default(),
        }
    }

    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.url is empty".into()));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid("source.timeout_secs must be > 0".into()));
        }
        if self.source.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "source.max_retries must be at most {MAX_RETRIES}, got {}",
                self.source.max_retries
            )));
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh.interval_secs must be > 0".into()));
        }
        if self.signals.volume_window == 0 {
            return Err(ConfigError::Invalid("signals.volume_window must be > 0".into()));
        }
        let sigmas = self.signals.deviation_sigmas;
        if !sigmas.is_finite() || sigmas <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "signals.deviation_sigmas must be positive, got {sigmas}"
            )));
        }
        Ok(())
    }

    /// Volume spikes need a per-day volume dataset.
    pub fn volume_spikes_enabled(&self) -> bool {
        self.source.volume_url.is_some()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn layout(&self) -> TableLayout {
        TableLayout {
            id_column: self.table.id_column.clone(),
            volume_column: self.table.volume_column.clone(),
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.source.timeout_secs),
            max_retries: self.source.max_retries,
            user_agent: self.source.user_agent.clone(),
            ..HttpOptions::default()
        }
    }

    /// Build the loader described by the `[source]` and `[table]` sections.
    pub fn build_loader(&self) -> Result<DatasetLoader, ConfigError> {
        let opts = self.http_options();
        let prices = open_source(&self.source.url, &opts)?;
        let mut loader = DatasetLoader::new(prices, self.layout());
        if let Some(volume_url) = &self.source.volume_url {
            loader = loader.with_volume_source(open_source(volume_url, &opts)?);
        }
        Ok(loader)
    }
}

/// Pick a source implementation from the shape of `location`.
pub fn open_source(location: &str, opts: &HttpOptions) -> Result<Box<dyn DataSource>, ConfigError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let source = HttpSource::new(location, opts.clone()).map_err(|error| {
            ConfigError::Source {
                location: location.to_string(),
                error,
            }
        })?;
        return Ok(Box::new(source));
    }
    let path = location.strip_prefix("file://").unwrap_or(location);
    Ok(Box::new(FileSource::new(path)))
}
