//! TOML fixture files describing simulated devices
//!
//! ```toml
//! [[device]]
//! ip = "192.168.1.201"
//! port = 4370
//! latency_ms = 50
//!
//! [device.info]
//! serial_number = "CKJ1234"
//!
//! [[device.users]]
//! uid = 1
//! user_id = "1001"
//! name = "Alice"
//!
//! [[device.attendance]]
//! user_id = "1001"
//! timestamp = "2024-01-10T08:01:00"
//! punch = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use punch_core::{AttendanceRecord, DeviceInfo, UserRecord, DEFAULT_PORT};
use serde::Deserialize;
use thiserror::Error;

use crate::connector::SimulatedConnector;
use crate::device::SimDevice;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parsed fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct SimFixture {
    #[serde(default, rename = "device")]
    pub devices: Vec<FixtureDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureDevice {
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_reachable")]
    pub reachable: bool,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub info: DeviceInfo,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_reachable() -> bool {
    true
}

impl SimFixture {
    pub fn parse(content: &str) -> Result<Self, FixtureError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Build a connector holding every device in the fixture
    pub fn into_connector(self) -> SimulatedConnector {
        let connector = SimulatedConnector::new();
        for d in self.devices {
            tracing::debug!(
                ip = %d.ip,
                port = d.port,
                users = d.users.len(),
                punches = d.attendance.len(),
                "Loaded simulated device"
            );
            let device = SimDevice {
                info: d.info,
                users: d.users,
                attendance: d.attendance,
                reachable: d.reachable,
                latency: Duration::from_millis(d.latency_ms),
            };
            connector.insert(&d.ip, d.port, device);
        }
        connector
    }
}

impl SimulatedConnector {
    /// Connector populated from a fixture file
    pub fn from_fixture(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        Ok(SimFixture::load(path)?.into_connector())
    }
}
