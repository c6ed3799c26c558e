//! Application configuration read from `config.toml`.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;
use serde::Deserialize;

const CONFIG_DIR: &str = "tasklane";
const CONFIG_FILE: &str = "config.toml";

/// Task list endpoint used when no configuration overrides it.
pub const DEFAULT_API_BASE_URL: &str = "https://6840ae275b39a8039a58d780.mockapi.io/todos";

/// Top-level application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Local cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Where local state is kept.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Location of the user configuration file, if the platform has a config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from `path`, or from [`default_path`](Self::default_path)
    /// when `path` is `None`. A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(config_path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("invalid config {}", config_path.display()))
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    /// Returns an error for malformed TOML or out-of-range values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.cache.validate()
    }

    /// Directory holding the key-value store.
    ///
    /// # Errors
    /// Returns an error if no directory is configured and the platform has no data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(CONFIG_DIR)))
            .ok_or_else(|| anyhow!("no data directory available; set storage.data_dir"))
    }
}

/// `[api]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Task collection URL; items live at `<base_url>/<id>`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Per-request transport timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("api.base_url '{}' is not a valid URL", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api.base_url must use http or https, got '{}'", url.scheme());
        }
        if self.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum cache age in seconds.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
        }
    }
}

impl CacheConfig {
    /// Maximum age of a usable cache entry.
    #[must_use]
    pub fn freshness(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.freshness_secs).unwrap_or(i64::MAX))
    }

    fn validate(&self) -> Result<()> {
        if self.freshness_secs == 0 {
            bail!("cache.freshness_secs must be greater than zero");
        }
        Ok(())
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Data directory; `<platform data dir>/tasklane` when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_freshness_secs() -> u64 {
    300
}
