//! punch-core - Core traits and types for the time-clock gateway
//!
//! This crate provides the device boundary (connector, session and the
//! scoped lease around it), the records a time-clock reports, and the
//! shaping helpers that turn raw punches into per-user, per-day views.

pub mod device;
pub mod error;
pub mod models;
pub mod punch;
pub mod shaping;

pub use device::{DeviceConnector, DeviceEndpoint, DeviceLease, DeviceSession};
pub use error::{DeviceError, DeviceResult};
pub use models::*;
pub use punch::PunchLabels;
pub use shaping::{DaySummary, RecordFilter, TimelineEntry};

/// Default TCP/UDP port time-clocks listen on
pub const DEFAULT_PORT: u16 = 4370;

/// Default device handshake timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
