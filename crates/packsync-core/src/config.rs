use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::transfer::TransferOptions;

/// Same-URL retry parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts against one URL before moving to the next mirror (including the first).
    pub attempts_per_url: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { attempts_per_url: 1 }
    }
}

/// Global configuration loaded from `~/.config/packsync/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Concurrent downloads; unset means twice the CPU count.
    #[serde(default)]
    pub threads: Option<usize>,
    pub connect_timeout_secs: u64,
    /// Cap on a single request, 0 = none.
    pub request_timeout_secs: u64,
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    pub user_agent: String,
    /// Java executable for loader installers; falls back to `java` on PATH.
    #[serde(default)]
    pub java_path: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            threads: None,
            connect_timeout_secs: 30,
            request_timeout_secs: 1800,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            user_agent: format!("packsync/{}", env!("CARGO_PKG_VERSION")),
            java_path: None,
            retry: RetryConfig::default(),
        }
    }
}

impl InstallerConfig {
    /// Worker count: configured value, or the CPU-derived default.
    pub fn threads(&self) -> usize {
        self.threads.filter(|n| *n > 0).unwrap_or_else(default_threads)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            low_speed_limit: self.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            user_agent: self.user_agent.clone(),
            retry: RetryPolicy::new(self.retry.attempts_per_url),
        }
    }

    pub fn java(&self) -> PathBuf {
        self.java_path.clone().unwrap_or_else(|| PathBuf::from("java"))
    }
}

/// Twice the available parallelism (downloads are I/O bound).
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(4)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("packsync")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<InstallerConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = InstallerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: InstallerConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
