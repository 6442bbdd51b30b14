use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::policy::VerifyPolicy;

/// Chunklist fetch timeouts (optional `[fetch]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/cnkl/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CnklConfig {
    /// Verify downloads whenever a chunklist is available.
    pub verify_if_present: bool,
    /// Refuse downloads that have no chunklist instead of trusting them.
    pub require_chunklist: bool,
    /// How often the CLI polls a running verification for progress, in milliseconds.
    pub poll_interval_ms: u64,
    pub fetch: FetchConfig,
}

impl Default for CnklConfig {
    fn default() -> Self {
        Self {
            verify_if_present: true,
            require_chunklist: false,
            poll_interval_ms: 100,
            fetch: FetchConfig::default(),
        }
    }
}

impl CnklConfig {
    pub fn policy(&self) -> VerifyPolicy {
        VerifyPolicy {
            verify_if_present: self.verify_if_present,
            require_chunklist: self.require_chunklist,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cnkl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the XDG config dir, creating a default file if none exists.
pub fn load_or_init() -> Result<CnklConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<CnklConfig> {
    if !path.exists() {
        let default_cfg = CnklConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CnklConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
