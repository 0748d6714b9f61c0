//! Application state for the gateway API

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use punch_core::{DeviceConnector, DeviceLease, DeviceResult};
use punch_forward::{Forwarder, HrApi, DEFAULT_DEVICE_CODE};
use punch_store::{DeviceRegistry, StoreResult};

use crate::error::ApiError;
use crate::extract::DeviceSelection;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    registry: Arc<DeviceRegistry>,
    connector: Arc<dyn DeviceConnector>,
    forwarder: Forwarder,
    /// Device code stamped on every outbound record
    device_code: Arc<str>,
    /// When records were last delivered; not persisted
    last_sync: Arc<RwLock<Option<NaiveDateTime>>>,
}

impl AppState {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        connector: Arc<dyn DeviceConnector>,
        hr: Arc<dyn HrApi>,
    ) -> Self {
        Self {
            registry,
            connector,
            forwarder: Forwarder::new(hr),
            device_code: Arc::from(DEFAULT_DEVICE_CODE),
            last_sync: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_device_code(mut self, code: impl AsRef<str>) -> Self {
        self.device_code = Arc::from(code.as_ref());
        self
    }

    /// Pause between single-record sends after a refused batch
    pub fn with_individual_delay(mut self, delay: Duration) -> Self {
        self.forwarder = self.forwarder.with_individual_delay(delay);
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    pub fn hr(&self) -> &Arc<dyn HrApi> {
        self.forwarder.api()
    }

    pub fn device_code(&self) -> &str {
        &self.device_code
    }

    pub fn last_sync(&self) -> Option<NaiveDateTime> {
        *self.last_sync.read()
    }

    pub fn mark_synced(&self, at: NaiveDateTime) {
        *self.last_sync.write() = Some(at);
    }

    /// Run a registry operation on a blocking worker thread.
    ///
    /// Mutations fsync the config file before they return.
    pub async fn with_registry<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&DeviceRegistry) -> StoreResult<T> + Send + 'static,
    {
        let registry = self.registry.clone();
        Ok(tokio::task::spawn_blocking(move || f(&registry)).await??)
    }

    /// Resolve the device this request targets
    pub async fn active_device_id(&self, selection: &DeviceSelection) -> Result<String, ApiError> {
        let selection = selection.clone();
        self.with_registry(move |registry| {
            registry.require_active(selection.header(), selection.session())
        })
        .await
    }

    /// Run `f` against the resolved device on a blocking worker thread
    pub async fn with_active_device<T, F>(
        &self,
        selection: &DeviceSelection,
        f: F,
    ) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut DeviceLease) -> DeviceResult<T> + Send + 'static,
    {
        let device_id = self.active_device_id(selection).await?;
        self.with_device(device_id, f).await
    }

    /// Run `f` against a registered device on a blocking worker thread.
    ///
    /// The lease is released when `f` returns, whatever the outcome.
    pub async fn with_device<T, F>(&self, device_id: String, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut DeviceLease) -> DeviceResult<T> + Send + 'static,
    {
        let registry = self.registry.clone();
        let connector = self.connector.clone();

        tokio::task::spawn_blocking(move || -> Result<T, ApiError> {
            let mut lease = registry.connect(connector.as_ref(), &device_id)?;
            Ok(f(&mut lease)?)
        })
        .await?
    }

    /// Connect to a registered device and release it again
    pub async fn test_device(&self, device_id: String) -> Result<bool, ApiError> {
        let registry = self.registry.clone();
        let connector = self.connector.clone();

        tokio::task::spawn_blocking(move || registry.test_connection(connector.as_ref(), &device_id))
            .await?
            .map_err(ApiError::from)
    }
}
