//! Daemon configuration
//!
//! An optional TOML file, overridden by command-line flags. Every section
//! and key may be left out.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use punch_forward::{HrClientConfig, DEFAULT_DEVICE_CODE};
use serde::Deserialize;

/// Default listen address
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5000";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub forward: ForwardSection,
    pub simulator: SimulatorSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// The JSON config document; `<data dir>/config.json` when unset
    pub config_path: Option<PathBuf>,
    /// Pre-registry `devices.json`; next to `config_path` when unset
    pub legacy_devices_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwardSection {
    pub device_code: String,
    /// Pause between single-record sends after a refused batch
    pub individual_delay_ms: u64,
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
}

impl Default for ForwardSection {
    fn default() -> Self {
        Self {
            device_code: DEFAULT_DEVICE_CODE.to_string(),
            individual_delay_ms: 500,
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

impl ForwardSection {
    pub fn individual_delay(&self) -> Duration {
        Duration::from_millis(self.individual_delay_ms)
    }

    pub fn client_config(&self) -> HrClientConfig {
        HrClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulatorSection {
    /// TOML fixture describing the simulated devices; a built-in demo
    /// device is used when unset
    pub fixture: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.server.listen))
    }

    /// Path of the JSON config document, relative to `data_dir` by default
    pub fn config_path(&self, data_dir: &Path) -> PathBuf {
        self.storage
            .config_path
            .clone()
            .unwrap_or_else(|| data_dir.join("config.json"))
    }
}
