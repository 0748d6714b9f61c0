//! Error types for the device boundary

use thiserror::Error;

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised while talking to a time-clock
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device unreachable, handshake refused, or session not connected
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// User (or other device-side entity) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Device answered with something we could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Device did not answer within the session timeout
    #[error("Device timed out after {0}s")]
    Timeout(u64),

    /// Request rejected before reaching the device
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeviceError {
    /// Whether the error means the device could not be reached at all
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DeviceError::ConnectionFailed(_) | DeviceError::Timeout(_))
    }
}
