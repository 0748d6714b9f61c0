//! Device registry handlers

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Local;
use indexmap::IndexMap;
use punch_core::{DeviceInfo, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
use punch_store::{Device, DeviceSpec};
use serde::{Deserialize, Serialize};

use super::StatusMessage;
use crate::error::ApiError;
use crate::extract::{
    opt_lenient_int, opt_string_or_number, DeviceSelection, JsonBody, ACTIVE_DEVICE_COOKIE,
};
use crate::state::AppState;

#[derive(Serialize)]
pub struct DevicesResponse {
    pub status: &'static str,
    pub devices: IndexMap<String, Device>,
    pub active_device: Option<String>,
}

#[derive(Serialize)]
pub struct DeviceResponse {
    pub status: &'static str,
    pub device_id: String,
    pub device: Device,
}

/// Result of a change that names the device it touched
#[derive(Serialize)]
pub struct DeviceActionResponse {
    pub status: &'static str,
    pub message: String,
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddDeviceRequest {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub port: Option<u16>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeviceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub port: Option<u16>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub device_ip: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub device_port: Option<u16>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub device_id: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectedDevice {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub users: usize,
    pub attendance: usize,
}

#[derive(Serialize)]
pub struct ConnectResponse {
    pub status: &'static str,
    pub message: String,
    pub device_id: String,
    pub device_info: ConnectedDevice,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require_device(state: &AppState, device_id: &str) -> Result<Device, ApiError> {
    state
        .registry()
        .get(device_id)
        .ok_or_else(|| ApiError::NotFound(format!("Device {device_id} not found")))
}

/// GET /api/devices
pub async fn list_devices(
    State(state): State<AppState>,
    selection: DeviceSelection,
) -> Result<Json<DevicesResponse>, ApiError> {
    let active_device = state
        .with_registry(move |registry| {
            Ok(registry.resolve_active(selection.header(), selection.session()))
        })
        .await?;

    Ok(Json(DevicesResponse {
        status: "success",
        devices: state.registry().devices(),
        active_device,
    }))
}

/// POST /api/devices
///
/// Registers (or overwrites) a device and tests it. A reachable device
/// becomes the active one; an unreachable one is kept with a warning.
pub async fn add_device(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AddDeviceRequest>,
) -> Result<Json<DeviceActionResponse>, ApiError> {
    let (Some(device_id), Some(name), Some(ip)) = (
        non_blank(request.device_id),
        non_blank(request.name),
        non_blank(request.ip),
    ) else {
        return Err(ApiError::validation(
            "Device ID, name, and IP address are required",
        ));
    };

    let spec = DeviceSpec::new(name.clone(), ip)
        .with_port(request.port.unwrap_or(DEFAULT_PORT))
        .with_timeout(request.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let id = device_id.clone();
    state
        .with_registry(move |registry| registry.add_or_update(&id, spec))
        .await?;

    if state.test_device(device_id.clone()).await? {
        let id = device_id.clone();
        state
            .with_registry(move |registry| registry.set_active(&id))
            .await?;
        Ok(Json(DeviceActionResponse {
            status: "success",
            message: format!("Device {name} added successfully and set as active"),
            device_id,
        }))
    } else {
        Ok(Json(DeviceActionResponse {
            status: "warning",
            message: format!("Device {name} added but connection test failed"),
            device_id,
        }))
    }
}

/// GET /api/devices/{device_id}
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = require_device(&state, &device_id)?;
    Ok(Json(DeviceResponse {
        status: "success",
        device_id,
        device,
    }))
}

/// PUT /api/devices/{device_id}
///
/// Fields left out keep their current values.
pub async fn update_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    JsonBody(request): JsonBody<UpdateDeviceRequest>,
) -> Result<Json<DeviceActionResponse>, ApiError> {
    let current = require_device(&state, &device_id)?;

    let mut spec = DeviceSpec::from(&current);
    if let Some(name) = non_blank(request.name) {
        spec.name = name;
    }
    if let Some(ip) = non_blank(request.ip) {
        spec.ip = ip;
    }
    if let Some(port) = request.port {
        spec.port = port;
    }
    if let Some(timeout) = request.timeout {
        spec.timeout = timeout;
    }

    let name = spec.name.clone();
    let id = device_id.clone();
    state
        .with_registry(move |registry| registry.add_or_update(&id, spec))
        .await?;

    Ok(Json(DeviceActionResponse {
        status: "success",
        message: format!("Device {name} updated successfully"),
        device_id,
    }))
}

/// DELETE /api/devices/{device_id}
pub async fn delete_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    let id = device_id.clone();
    let removed = state
        .with_registry(move |registry| registry.remove(&id))
        .await?;
    if !removed {
        return Err(ApiError::NotFound(format!("Device {device_id} not found")));
    }
    Ok(Json(StatusMessage::success(format!(
        "Device {device_id} deleted successfully"
    ))))
}

/// POST /api/devices/{device_id}/set-active
///
/// Also pins the choice to the caller's session cookie.
pub async fn set_active_device(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(device_id): Path<String>,
) -> Result<(CookieJar, Json<StatusMessage>), ApiError> {
    let id = device_id.clone();
    state
        .with_registry(move |registry| registry.set_active(&id))
        .await?;

    let cookie = Cookie::build((ACTIVE_DEVICE_COOKIE, device_id.clone()))
        .path("/")
        .http_only(true);

    Ok((
        jar.add(cookie),
        Json(StatusMessage::success(format!(
            "Device {device_id} set as active"
        ))),
    ))
}

/// POST /api/devices/{device_id}/test-connection
pub async fn test_device_connection(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    require_device(&state, &device_id)?;

    if state.test_device(device_id.clone()).await? {
        Ok(Json(StatusMessage::success(format!(
            "Connection to device {device_id} successful"
        ))))
    } else {
        Err(ApiError::ConnectionFailed(format!(
            "Connection to device {device_id} failed"
        )))
    }
}

/// POST /api/connect
///
/// Connects to a registered device, or registers a new one from an address
/// and connects to it. A device created here is removed again when the
/// connection fails.
pub async fn connect(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ConnectRequest>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let (device_id, created) = match non_blank(request.device_id) {
        Some(id) => {
            require_device(&state, &id)?;
            (id, false)
        }
        None => {
            let ip = non_blank(request.device_ip)
                .ok_or_else(|| ApiError::validation("IP address is required"))?;
            let id = fresh_device_id(&state);
            let name = non_blank(request.device_name).unwrap_or_else(|| format!("Device {ip}"));
            let spec = DeviceSpec::new(name, ip)
                .with_port(request.device_port.unwrap_or(DEFAULT_PORT))
                .with_timeout(request.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
            let new_id = id.clone();
            state
                .with_registry(move |registry| registry.add_or_update(&new_id, spec))
                .await?;
            (id, true)
        }
    };
    let id = device_id.clone();
    state
        .with_registry(move |registry| registry.set_active(&id))
        .await?;

    let result = state
        .with_device(device_id.clone(), |lease| {
            let info = lease.device_info()?;
            let users = lease.list_users()?.len();
            let attendance = lease.list_attendance()?.len();
            Ok(ConnectedDevice {
                info,
                users,
                attendance,
            })
        })
        .await;

    match result {
        Ok(device_info) => {
            let address = state
                .registry()
                .get(&device_id)
                .map(|d| d.ip)
                .unwrap_or_default();
            tracing::info!(device_id = %device_id, %address, "Connected to device");
            Ok(Json(ConnectResponse {
                status: "success",
                message: format!("Connected to device at {address}"),
                device_id,
                device_info,
            }))
        }
        Err(e) => {
            if created {
                let id = device_id.clone();
                match state.with_registry(move |registry| registry.remove(&id)).await {
                    Ok(_) => {
                        tracing::info!(device_id = %device_id, "Removed device after connection failure")
                    }
                    Err(err) => {
                        tracing::error!(device_id = %device_id, error = %err, "Error removing device")
                    }
                }
            }
            Err(e)
        }
    }
}

/// `device_YYYYmmddHHMMSS`, suffixed when that id is taken
fn fresh_device_id(state: &AppState) -> String {
    let base = format!("device_{}", Local::now().format("%Y%m%d%H%M%S"));
    let mut id = base.clone();
    let mut n = 2;
    while state.registry().contains(&id) {
        id = format!("{base}_{n}");
        n += 1;
    }
    id
}
