//! HTTP request handlers for the gateway API
//!
//! Device handlers resolve the target device from the request, run their
//! device work inside a lease on a blocking worker and shape the result.

pub mod attendance;
pub mod device_info;
pub mod devices;
pub mod settings;
pub mod stats;
pub mod sync;
pub mod users;

use serde::Serialize;

/// `{status, message}` body shared by handlers that only confirm an action
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}
