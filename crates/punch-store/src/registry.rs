//! Device registry
//!
//! Owns the in-memory config document behind one lock. Every mutation is
//! written through the [`ConfigStore`] before the lock is released, so the
//! file on disk always matches the last completed mutation.

use chrono::Local;
use indexmap::IndexMap;
use parking_lot::RwLock;
use punch_core::{DeviceConnector, DeviceLease};

use crate::config::{Config, Device, DeviceSpec, LastSend};
use crate::error::{StoreError, StoreResult};
use crate::store::ConfigStore;

/// Registered devices, the active selection and HR API settings
#[derive(Debug)]
pub struct DeviceRegistry {
    store: ConfigStore,
    state: RwLock<Config>,
}

impl DeviceRegistry {
    /// Load the document from `store` and take ownership of it
    pub fn open(store: ConfigStore) -> Self {
        let config = store.load();
        Self {
            store,
            state: RwLock::new(config),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Copy of the whole document
    pub fn snapshot(&self) -> Config {
        self.state.read().clone()
    }

    pub fn devices(&self) -> IndexMap<String, Device> {
        self.state.read().registered_devices.clone()
    }

    pub fn get(&self, id: &str) -> Option<Device> {
        self.state.read().registered_devices.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().registered_devices.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().registered_devices.is_empty()
    }

    /// Stored active id, without resolution
    pub fn active_device(&self) -> Option<String> {
        self.state.read().active_device.clone()
    }

    /// Insert or overwrite a device. Returns `true` when it was created.
    ///
    /// Updating keeps the recorded `last_connected`.
    pub fn add_or_update(&self, id: &str, spec: DeviceSpec) -> StoreResult<bool> {
        let created = self.mutate(|config| {
            let last_connected = config
                .registered_devices
                .get(id)
                .and_then(|d| d.last_connected);
            let device = Device {
                name: spec.name,
                ip: spec.ip,
                port: spec.port,
                timeout: spec.timeout,
                last_connected,
            };
            config
                .registered_devices
                .insert(id.to_string(), device)
                .is_none()
        })?;

        tracing::info!(device_id = %id, created, "Device saved");
        Ok(created)
    }

    /// Delete a device. Clears the active selection when it pointed here.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        if !self.contains(id) {
            return Ok(false);
        }

        self.mutate(|config| {
            // shift_remove keeps the insertion order of the remaining devices
            let removed = config.registered_devices.shift_remove(id).is_some();
            if config.active_device.as_deref() == Some(id) {
                config.active_device = None;
            }
            removed
        })?;

        tracing::info!(device_id = %id, "Device removed");
        Ok(true)
    }

    /// Make `id` the stored active device
    pub fn set_active(&self, id: &str) -> StoreResult<()> {
        self.mutate(|config| {
            if !config.registered_devices.contains_key(id) {
                return Err(StoreError::DeviceNotFound(id.to_string()));
            }
            config.active_device = Some(id.to_string());
            Ok(())
        })??;

        tracing::info!(device_id = %id, "Active device set");
        Ok(())
    }

    /// Pick the device a request should target.
    ///
    /// Precedence: header override, session value, stored active id, first
    /// registered device. Candidates that are not registered are skipped. The
    /// result is written back as the stored active id when it changed.
    pub fn resolve_active(
        &self,
        header_override: Option<&str>,
        session_value: Option<&str>,
    ) -> Option<String> {
        let (resolved, changed) = {
            let config = self.state.read();
            let devices = &config.registered_devices;

            let resolved = [
                header_override,
                session_value,
                config.active_device.as_deref(),
            ]
            .into_iter()
            .flatten()
            .find(|id| devices.contains_key(*id))
            .map(str::to_string)
            .or_else(|| devices.keys().next().cloned())?;

            let changed = config.active_device.as_deref() != Some(resolved.as_str());
            (resolved, changed)
        };

        if changed {
            let id = resolved.clone();
            let result = self.mutate(|config| {
                if config.registered_devices.contains_key(&id) {
                    config.active_device = Some(id);
                }
            });
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to persist active device");
            }
        }

        Some(resolved)
    }

    /// Like [`resolve_active`](Self::resolve_active) but fails when nothing
    /// can be selected
    pub fn require_active(
        &self,
        header_override: Option<&str>,
        session_value: Option<&str>,
    ) -> StoreResult<String> {
        if self.is_empty() {
            return Err(StoreError::NoDeviceRegistered);
        }
        // The registry may have been emptied between the two reads
        self.resolve_active(header_override, session_value)
            .ok_or(StoreError::NoActiveDevice)
    }

    /// Open a lease on a registered device and record the connection time
    pub fn connect(&self, connector: &dyn DeviceConnector, id: &str) -> StoreResult<DeviceLease> {
        let device = self
            .get(id)
            .ok_or_else(|| StoreError::DeviceNotFound(id.to_string()))?;
        let endpoint = device.endpoint();

        let lease = DeviceLease::open(connector, id, &endpoint).map_err(|e| {
            tracing::warn!(device_id = %id, endpoint = %endpoint, error = %e, "Device connection failed");
            e
        })?;

        let now = Local::now().naive_local();
        let result = self.mutate(|config| {
            if let Some(device) = config.registered_devices.get_mut(id) {
                device.last_connected = Some(now);
            }
        });
        if let Err(e) = result {
            tracing::error!(device_id = %id, error = %e, "Failed to record connection time");
        }

        tracing::info!(device_id = %id, endpoint = %endpoint, "Connected to device");
        Ok(lease)
    }

    /// Connect and release immediately
    pub fn test_connection(&self, connector: &dyn DeviceConnector, id: &str) -> StoreResult<bool> {
        match self.connect(connector, id) {
            Ok(lease) => {
                lease.release();
                Ok(true)
            }
            Err(StoreError::Device(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Store base URL and token and derive the endpoint URLs from them
    pub fn update_settings(&self, base_api_url: &str, api_token: &str) -> StoreResult<Config> {
        let base = base_api_url.trim().trim_end_matches('/').to_string();
        let token = api_token.trim().to_string();

        let config = self.mutate(|config| {
            config.attendance_api_url = format!("{base}/attendance?token={token}");
            config.employees_api_url = format!("{base}/employees?token={token}");
            config.base_api_url = base.clone();
            config.api_token = token.clone();
            config.clone()
        })?;

        tracing::info!(base_api_url = %config.base_api_url, "API settings updated");
        Ok(config)
    }

    /// Remember the last batch the HR API accepted
    pub fn record_send(&self, send: LastSend) -> StoreResult<()> {
        self.mutate(|config| config.last_successful_send = Some(send))
    }

    /// Write the current document to disk
    pub fn persist(&self) -> StoreResult<()> {
        let config = self.state.read();
        self.store.save(&config)
    }

    /// Apply `f` to a copy and save it while still holding the write lock.
    ///
    /// The copy replaces the in-memory document only once it is on disk, so a
    /// failed save leaves the registry unchanged.
    fn mutate<T>(&self, f: impl FnOnce(&mut Config) -> T) -> StoreResult<T> {
        let mut config = self.state.write();
        let mut next = config.clone();
        let out = f(&mut next);
        self.store.save(&next)?;
        *config = next;
        Ok(out)
    }
}
