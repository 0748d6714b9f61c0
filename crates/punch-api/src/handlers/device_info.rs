//! Device info handler

use axum::extract::State;
use axum::Json;
use punch_core::DeviceInfo;
use punch_store::Device;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::DeviceSelection;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DeviceInfoResponse {
    pub status: &'static str,
    pub device_info: DeviceDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Registered details, plus whatever the device reported when reachable
#[derive(Serialize)]
pub struct DeviceDetails {
    pub id: String,
    #[serde(flatten)]
    pub device: Device,
    pub last_sync: Option<String>,
    #[serde(flatten)]
    pub reported: DeviceInfo,
}

/// GET /api/device-info
///
/// An unreachable device is not an error here: the registered details come
/// back with `status: "warning"`.
pub async fn get_device_info(
    State(state): State<AppState>,
    selection: DeviceSelection,
) -> Result<Json<DeviceInfoResponse>, ApiError> {
    let device_id = state.active_device_id(&selection).await?;
    let device = state
        .registry()
        .get(&device_id)
        .ok_or_else(|| ApiError::NoActiveDevice(format!("Device {device_id} is no longer registered")))?;
    let last_sync = state.last_sync().map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string());

    match state.with_device(device_id.clone(), |lease| lease.device_info()).await {
        Ok(reported) => {
            // Re-read so last_connected reflects this connection
            let device = state.registry().get(&device_id).unwrap_or(device);
            Ok(Json(DeviceInfoResponse {
                status: "success",
                device_info: DeviceDetails {
                    id: device_id,
                    device,
                    last_sync,
                    reported,
                },
                message: None,
            }))
        }
        Err(ApiError::ConnectionFailed(reason)) => {
            tracing::warn!(device_id = %device_id, %reason, "Could not connect to device for additional info");
            Ok(Json(DeviceInfoResponse {
                status: "warning",
                device_info: DeviceDetails {
                    id: device_id,
                    device,
                    last_sync,
                    reported: DeviceInfo::default(),
                },
                message: Some(format!("Device configured but connection failed: {reason}")),
            }))
        }
        Err(e) => Err(e),
    }
}
