//! Config store - the JSON document on disk
//!
//! `load` never fails: a missing file is created with defaults and a
//! malformed one is backed up to `<path>.bak` and replaced. `save` writes the
//! whole document and syncs it to disk before returning; the last writer wins.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::config::{Config, Device};
use crate::error::{StoreError, StoreResult};

/// File name of the pre-registry device list, kept for migration
pub const LEGACY_DEVICES_FILE: &str = "devices.json";

/// Reads and writes the config document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    legacy_devices_path: PathBuf,
}

impl ConfigStore {
    /// Store at `path`; the legacy device file is looked up next to it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let legacy_devices_path = path.with_file_name(LEGACY_DEVICES_FILE);
        Self {
            path,
            legacy_devices_path,
        }
    }

    /// Override where the legacy device file is read from
    pub fn with_legacy_devices(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_devices_path = path.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Load the document, self-healing a missing or malformed file
    pub fn load(&self) -> Config {
        tracing::info!(path = %self.path.display(), "Loading config");

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Config file not found, creating with default values");
                return self.fresh_default();
            }
            Err(e) => {
                // Unreadable but present: do not overwrite what we cannot see
                tracing::error!(path = %self.path.display(), error = %e, "Error reading config file");
                return self.default_with_legacy();
            }
        };

        if content.trim().is_empty() {
            tracing::warn!(path = %self.path.display(), "Config file exists but is empty");
            return self.fresh_default();
        }

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "JSON decode error loading config");
                return self.recover_corrupt();
            }
        };

        let has_devices = value.get("registered_devices").is_some_and(Value::is_object);

        let mut config: Config = match serde_json::from_value(value) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Config file has an invalid shape");
                return self.recover_corrupt();
            }
        };

        if !has_devices {
            tracing::warn!("No registered_devices in config, trying legacy device file");
            if let Some(devices) = self.read_legacy_devices() {
                config.registered_devices = devices;
                self.save_logged(&config);
            }
        }

        if let Some(active) = &config.active_device {
            if !config.registered_devices.contains_key(active) {
                tracing::warn!(active = %active, "Stored active device is not registered, ignoring");
                config.active_device = None;
            }
        }

        tracing::info!(
            devices = config.registered_devices.len(),
            active = ?config.active_device,
            "Config loaded"
        );
        config
    }

    /// Write the whole document, flush and fsync before returning
    pub fn save(&self, config: &Config) -> StoreResult<()> {
        let bytes = to_pretty_json(config)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.flush()?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        };
        write().map_err(|e| StoreError::io(&self.path, e))?;

        tracing::debug!(
            path = %self.path.display(),
            devices = config.registered_devices.len(),
            "Config saved"
        );
        Ok(())
    }

    fn save_logged(&self, config: &Config) {
        if let Err(e) = self.save(config) {
            tracing::error!(error = %e, "Failed to write config file");
        }
    }

    fn default_with_legacy(&self) -> Config {
        let mut config = Config::default();
        if let Some(devices) = self.read_legacy_devices() {
            config.registered_devices = devices;
        }
        config
    }

    fn fresh_default(&self) -> Config {
        let config = self.default_with_legacy();
        self.save_logged(&config);
        config
    }

    fn recover_corrupt(&self) -> Config {
        let backup = self.backup_path();
        match fs::copy(&self.path, &backup) {
            Ok(_) => tracing::info!(backup = %backup.display(), "Created backup of corrupted config file"),
            Err(e) => tracing::error!(error = %e, "Failed to back up corrupted config file"),
        }
        self.fresh_default()
    }

    fn read_legacy_devices(&self) -> Option<IndexMap<String, Device>> {
        let content = fs::read_to_string(&self.legacy_devices_path).ok()?;
        match serde_json::from_str::<IndexMap<String, Device>>(&content) {
            Ok(devices) => {
                tracing::info!(
                    path = %self.legacy_devices_path.display(),
                    count = devices.len(),
                    "Loaded devices from legacy file"
                );
                Some(devices)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error loading devices from legacy file");
                None
            }
        }
    }
}

/// Serialize with 4-space indentation
fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}
