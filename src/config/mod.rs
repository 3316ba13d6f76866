// Configuration management: TOML file under the user config directory


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "deep-news-mcp";
const TRENDS_CACHE_FILE_NAME: &str = "google_trends_cache.csv";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub bigkinds: BigKindsConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub widgets: WidgetConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BigKindsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_retries: u32,
    pub rate_limit_delay_ms: u64,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub accept_invalid_certs: bool,
}

impl Default for BigKindsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bigkinds.or.kr".to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
            max_retries: 3,
            rate_limit_delay_ms: 500,
            backoff_initial_ms: 1000,
            backoff_max_ms: 30_000,
            accept_invalid_certs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageConfig {
    /// Only URLs containing this marker are probed for a missing extension
    pub host_marker: String,
    pub timeout_ms: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            host_marker: "bigkinds.or.kr".to_string(),
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendsConfig {
    pub cache_path: Option<PathBuf>,
    pub cache_max_age_hours: u64,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            cache_max_age_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WidgetConfig {
    /// Directory whose `<name>.html` files take precedence over the built-in templates
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No per-user configuration directory on this platform")]
    DirectoryError,
    #[error("BigKinds base URL is not a URL: {0}")]
    InvalidUrl(String),
    #[error("BigKinds base URL must use http or https, got '{0}'")]
    InvalidProtocol(String),
    #[error("Invalid timeout: {0} seconds (must be between 1 and 600)")]
    InvalidTimeout(u64),
    #[error("Invalid retry count: {0} (must be between 1 and 10)")]
    InvalidRetries(u32),
    #[error("Invalid HTTP port: {0}")]
    InvalidPort(u16),
    #[error("Invalid image timeout: {0} ms (must be greater than 0)")]
    InvalidImageTimeout(u64),
    #[error("Invalid cache max age: {0} hours (must be greater than 0)")]
    InvalidCacheMaxAge(u64),
    #[error("Could not render config as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory (`~/.config/deep-news-mcp` on Linux)
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn load_default() -> Result<Self> {
        let dir = Self::config_dir().context("Failed to resolve configuration directory")?;
        Self::load(dir)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bigkinds.validate()?;

        if self.images.timeout_ms == 0 {
            return Err(ConfigError::InvalidImageTimeout(self.images.timeout_ms));
        }

        if self.trends.cache_max_age_hours == 0 {
            return Err(ConfigError::InvalidCacheMaxAge(
                self.trends.cache_max_age_hours,
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        Ok(())
    }

    #[inline]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Trends cache file, defaulting to a file inside the config directory
    #[inline]
    pub fn trends_cache_path(&self) -> PathBuf {
        self.trends
            .cache_path
            .clone()
            .unwrap_or_else(|| self.base_dir.join(TRENDS_CACHE_FILE_NAME))
    }

    #[inline]
    pub fn trends_max_age(&self) -> Duration {
        Duration::from_secs(self.trends.cache_max_age_hours.saturating_mul(3600))
    }

    #[inline]
    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.images.timeout_ms)
    }
}

impl BigKindsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }

        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 600 {
            return Err(ConfigError::InvalidTimeout(self.connect_timeout_secs));
        }

        if !(1..=10).contains(&self.max_retries) {
            return Err(ConfigError::InvalidRetries(self.max_retries));
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}
