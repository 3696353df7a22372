//! Service configuration loaded from `aqhi.toml`.
//!
//! Every field has a default, so a missing file is not an error unless the
//! path was given explicitly. Resolution order for the file path:
//! `--config`, then `AQHI_CONFIG`, then `./aqhi.toml`.
//! `AQHI_DATA_SOURCE` overrides `source.kind` after the file is read.

use crate::core::error::AqhiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "aqhi.toml";
pub const CONFIG_ENV: &str = "AQHI_CONFIG";
pub const DATA_SOURCE_ENV: &str = "AQHI_DATA_SOURCE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub source: SourceConfig,
    pub ingest: IngestConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from("data").join(crate::core::schemas::MEASUREMENTS_DB_NAME),
        }
    }
}

/// Which upstream provides hourly measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Deterministic demo values.
    #[default]
    Mock,
    /// Generic HTTP JSON endpoint described by [`CustomSourceConfig`].
    Custom,
    /// China National Environmental Monitoring Center city feed.
    Cnemc,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Mock => "mock",
            SourceKind::Custom => "custom",
            SourceKind::Cnemc => "cnemc",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = AqhiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(SourceKind::Mock),
            "custom" => Ok(SourceKind::Custom),
            "cnemc" => Ok(SourceKind::Cnemc),
            other => Err(AqhiError::ConfigError(format!(
                "unknown data source '{}' (expected mock, custom or cnemc)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Per-request timeout for HTTP sources.
    pub timeout_secs: u64,
    pub custom: CustomSourceConfig,
    pub cnemc: CnemcConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            kind: SourceKind::Mock,
            timeout_secs: 15,
            custom: CustomSourceConfig::default(),
            cnemc: CnemcConfig::default(),
        }
    }
}

/// Generic HTTP JSON source.
///
/// Either `url_template` (with a `{city}` placeholder) or `url` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSourceConfig {
    pub url_template: Option<String>,
    pub url: Option<String>,
    /// Query parameter carrying the city name when `url` is fixed.
    pub city_param: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub fields: FieldNames,
}

/// Optional overrides for the JSON keys holding each pollutant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub pm25: Option<String>,
    pub o3: Option<String>,
    pub no2: Option<String>,
    pub so2: Option<String>,
}

impl FieldNames {
    pub fn pm25(&self) -> &str {
        self.pm25.as_deref().unwrap_or("pm25")
    }

    pub fn o3(&self) -> &str {
        self.o3.as_deref().unwrap_or("o3")
    }

    pub fn no2(&self) -> &str {
        self.no2.as_deref().unwrap_or("no2")
    }

    pub fn so2(&self) -> &str {
        self.so2.as_deref().unwrap_or("so2")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CnemcConfig {
    pub base_url: String,
}

impl Default for CnemcConfig {
    fn default() -> Self {
        CnemcConfig {
            base_url: "https://air.cnemc.cn:18007".to_string(),
        }
    }
}

/// What an ingestion pass does when one city's fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestPolicy {
    /// Record the failure and keep going with the remaining cities.
    #[default]
    Continue,
    /// Stop the pass and return the first failure.
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub policy: IngestPolicy,
    pub interval_secs: u64,
    /// Populate the current hour on first query when using the mock source.
    pub cold_start: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            policy: IngestPolicy::Continue,
            interval_secs: 3600,
            cold_start: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, AqhiError> {
        toml::from_str(content).map_err(|e| AqhiError::ConfigError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, AqhiError> {
        toml::to_string_pretty(self).map_err(|e| AqhiError::ConfigError(e.to_string()))
    }

    /// Config file location: `explicit`, then `AQHI_CONFIG`, then `./aqhi.toml`.
    ///
    /// The flag is true when the file was named by the caller and must exist.
    pub fn resolve_path(explicit: Option<&Path>) -> (PathBuf, bool) {
        choose_path(explicit, env::var(CONFIG_ENV).ok())
    }

    /// Resolve, read and parse the configuration, then apply env overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AqhiError> {
        let (path, required) = Self::resolve_path(explicit);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            Self::from_toml_str(&content)?
        } else if required {
            return Err(AqhiError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        } else {
            AppConfig::default()
        };

        if let Ok(kind) = env::var(DATA_SOURCE_ENV) {
            if !kind.trim().is_empty() {
                config.source.kind = kind.parse()?;
            }
        }
        Ok(config)
    }
}

fn choose_path(explicit: Option<&Path>, from_env: Option<String>) -> (PathBuf, bool) {
    match (explicit, from_env) {
        (Some(p), _) => (p.to_path_buf(), true),
        (None, Some(p)) if !p.trim().is_empty() => (PathBuf::from(p), true),
        _ => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}
