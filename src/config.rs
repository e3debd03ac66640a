use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{flog_debug, Error, Result};

pub const DEFAULT_DEADLINE_MS: u64 = 3_000;
pub const DEFAULT_CUSTOMER_DELAY_MS: u64 = 2_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_CUSTOMER_URL: &str = "http://httpbin.org/status/200";
pub const DEFAULT_PRODUCT_URL: &str = "http://httpbin.org/delay/2";

/// Settings read from `~/.fanout/fanout.toml`. Every field is optional in
/// the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overall deadline for one recommendation call.
    pub deadline_ms: u64,
    /// Simulated latency before the customer task issues its request.
    pub customer_delay_ms: u64,
    pub customer_url: String,
    pub product_url: String,
    /// Per-request timeout of the HTTP client.
    pub request_timeout_ms: u64,
    /// Default partition count for `sum`.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_DEADLINE_MS,
            customer_delay_ms: DEFAULT_CUSTOMER_DELAY_MS,
            customer_url: DEFAULT_CUSTOMER_URL.to_string(),
            product_url: DEFAULT_PRODUCT_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    pub fn fanout_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".fanout"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::fanout_dir()?.join("fanout.toml"))
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn customer_delay(&self) -> Duration {
        Duration::from_millis(self.customer_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        flog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            flog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        flog_debug!(
            "Config loaded: deadline_ms={}, customer_delay_ms={}, concurrency={}",
            config.deadline_ms,
            config.customer_delay_ms,
            config.concurrency
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        flog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.deadline_ms == 0 {
            return Err(Error::Validation("deadline_ms must be positive".to_string()));
        }
        Ok(())
    }
}
