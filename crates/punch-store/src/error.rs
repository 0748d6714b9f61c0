//! Error types for the config store and registry

use std::path::PathBuf;

use punch_core::DeviceError;
use thiserror::Error;

/// Result type for store and registry operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the config file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config document could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Unknown device id
    #[error("Device {0} not found")]
    DeviceNotFound(String),

    /// Registry is empty
    #[error("No devices registered. Please add a device in the settings.")]
    NoDeviceRegistered,

    /// Registry had devices but none could be selected
    #[error("No active device selected. Please select a device in the settings.")]
    NoActiveDevice,

    /// Opening the device session failed
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
