//! punch-store - Config store and device registry
//!
//! The config document is a single JSON file holding HR API settings, the
//! registered devices and the active-device selection. [`ConfigStore`] reads
//! and writes it; [`DeviceRegistry`] owns the in-memory copy and persists
//! every mutation.
//!
//! # Usage
//!
//! ```ignore
//! use punch_store::{ConfigStore, DeviceRegistry, DeviceSpec};
//!
//! let registry = DeviceRegistry::open(ConfigStore::new("config.json"));
//! registry.add_or_update("front", DeviceSpec::new("Front door", "192.168.1.201"))?;
//! let active = registry.resolve_active(None, None);
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod store;

pub use config::{Config, Device, DeviceSpec, LastSend, LastSendData};
pub use error::{StoreError, StoreResult};
pub use registry::DeviceRegistry;
pub use store::ConfigStore;
