//! punch-sim - Simulated time-clock devices
//!
//! Implements the device boundary from `punch-core` entirely in memory so the
//! gateway can run without the vendor SDK. Devices are addressed by
//! `ip:port`; each one keeps its own users, punches and identification.
//!
//! ```ignore
//! use punch_sim::{SimDevice, SimulatedConnector};
//!
//! let sim = SimulatedConnector::new()
//!     .with_device("192.168.1.201", 4370, SimDevice::new("CKJ1234"));
//! ```

mod connector;
mod device;
pub mod fixture;

pub use connector::SimulatedConnector;
pub use device::SimDevice;
pub use fixture::{FixtureError, SimFixture};
