use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::media_file::DEFAULT_MAX_UPLOAD_BYTES;
use crate::search::DEFAULT_MAX_RESULTS;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_UPLOAD_CONCURRENCY: usize = 1;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// YAML config file structure. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigYaml {
    /// Base URL of the media index API (e.g. `https://media.example.com/api`)
    pub api_url: Option<String>,
    /// `maxResults` sent with a search when the caller does not pick one
    pub default_max_results: Option<u32>,
    /// Number of uploads allowed in flight at once
    pub upload_concurrency: Option<usize>,
    /// Files larger than this are skipped before a batch starts
    pub max_upload_bytes: Option<u64>,
}

/// Client configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub default_max_results: u32,
    pub upload_concurrency: usize,
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            default_max_results: DEFAULT_MAX_RESULTS,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Default config file location: `<config dir>/mediafind/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mediafind").join("config.yaml"))
    }

    /// Load configuration.
    ///
    /// Reads `path` (or the default location when it exists), loads `.env`
    /// if present, then applies `MEDIAFIND_*` environment overrides.
    /// An explicit `path` that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded environment from .env");
        }

        let yaml = match path {
            Some(path) => Some(Self::read_yaml(path)?),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Some(Self::read_yaml(&path)?),
                None => None,
            },
        };

        let config = Self::from_yaml(yaml.unwrap_or_default());
        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        debug!("Config: {:?}", config);
        Ok(config)
    }

    fn read_yaml(path: &Path) -> Result<ConfigYaml, ConfigError> {
        info!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn from_yaml(yaml: ConfigYaml) -> Self {
        let defaults = Self::default();
        Self {
            api_url: yaml.api_url.unwrap_or(defaults.api_url),
            default_max_results: yaml
                .default_max_results
                .unwrap_or(defaults.default_max_results),
            upload_concurrency: yaml
                .upload_concurrency
                .unwrap_or(defaults.upload_concurrency),
            max_upload_bytes: yaml.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
        }
    }

    /// Apply `MEDIAFIND_*` overrides looked up through `var`.
    ///
    /// Empty values are ignored.
    pub fn with_env_overrides<F>(mut self, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("MEDIAFIND_API_URL") {
            self.api_url = url;
        }
        if let Some(v) = get("MEDIAFIND_MAX_RESULTS") {
            self.default_max_results = parse_number("MEDIAFIND_MAX_RESULTS", &v)?;
        }
        if let Some(v) = get("MEDIAFIND_UPLOAD_CONCURRENCY") {
            self.upload_concurrency = parse_number("MEDIAFIND_UPLOAD_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("MEDIAFIND_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_number("MEDIAFIND_MAX_UPLOAD_BYTES", &v)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url must not be empty".to_string()));
        }
        if self.default_max_results == 0 {
            return Err(ConfigError::Invalid(
                "default_max_results must be at least 1".to_string(),
            ));
        }
        if self.upload_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "upload_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}: not a number: {value}")))
}
