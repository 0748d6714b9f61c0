//! Config document types
//!
//! Field names match the keys of the on-disk JSON document.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use punch_core::{DeviceEndpoint, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of formatted records kept in `last_successful_send`
pub const PREVIEW_LIMIT: usize = 10;

/// The whole persisted config document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where attendance batches are POSTed
    #[serde(default)]
    pub attendance_api_url: String,
    /// Where employees are fetched from for imports
    #[serde(default)]
    pub employees_api_url: String,
    #[serde(default)]
    pub base_api_url: String,
    #[serde(default)]
    pub api_token: String,
    /// Registered devices in insertion order, keyed by device id
    #[serde(default)]
    pub registered_devices: IndexMap<String, Device>,
    /// Last explicitly selected device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_device: Option<String>,
    /// Observational record of the last delivered batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_send: Option<LastSend>,
    /// Keys this version does not know about, kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A registered device. The id is the key in `registered_devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Handshake timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub last_connected: Option<NaiveDateTime>,
}

impl Device {
    pub fn endpoint(&self) -> DeviceEndpoint {
        DeviceEndpoint::new(self.ip.clone(), self.port, self.timeout)
    }
}

/// Editable part of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl DeviceSpec {
    /// Spec with the default port and timeout
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&Device> for DeviceSpec {
    fn from(device: &Device) -> Self {
        Self {
            name: device.name.clone(),
            ip: device.ip.clone(),
            port: device.port,
            timeout: device.timeout,
        }
    }
}

/// Summary of the last batch the HR API accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSend {
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub last_send_time: String,
    pub last_send_data: LastSendData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSendData {
    pub count: usize,
    pub summary: String,
    #[serde(default)]
    pub records_preview: Vec<Value>,
}

impl LastSend {
    /// Build a record, truncating the preview to [`PREVIEW_LIMIT`] entries
    pub fn new(
        sent_at: NaiveDateTime,
        count: usize,
        summary: impl Into<String>,
        mut preview: Vec<Value>,
    ) -> Self {
        preview.truncate(PREVIEW_LIMIT);
        Self {
            last_send_time: sent_at
                .format(punch_core::DATETIME_FORMAT)
                .to_string(),
            last_send_data: LastSendData {
                count,
                summary: summary.into(),
                records_preview: preview,
            },
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
