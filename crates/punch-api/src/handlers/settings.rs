//! HR API settings handlers

use axum::extract::State;
use axum::Json;
use punch_store::Config;
use serde::{Deserialize, Serialize};

use super::StatusMessage;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ConfigResponse {
    pub status: &'static str,
    pub data: Config,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub status: &'static str,
    pub config: Config,
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub base_api_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Serialize)]
pub struct EmployeesUrlResponse {
    pub status: &'static str,
    pub employees_api_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    #[serde(default)]
    pub attendance_api_url: Option<String>,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        status: "success",
        data: state.registry().snapshot(),
    })
}

/// GET /api/config-settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        status: "success",
        config: state.registry().snapshot(),
    })
}

/// POST /api/config-settings
///
/// Stores the base URL and token; the attendance and employees URLs are
/// derived from them.
pub async fn save_settings(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SettingsRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let base = request.base_api_url.unwrap_or_default();
    let base = base.trim().trim_end_matches('/').to_string();
    let token = request.api_token.unwrap_or_default();

    if base.is_empty() || token.trim().is_empty() {
        return Err(ApiError::validation(
            "Both base_api_url and api_token are required.",
        ));
    }

    state
        .with_registry(move |registry| registry.update_settings(&base, &token))
        .await?;
    Ok(Json(StatusMessage::success("Configuration saved successfully")))
}

/// GET /api/employees-api-url
pub async fn employees_api_url(State(state): State<AppState>) -> Json<EmployeesUrlResponse> {
    Json(EmployeesUrlResponse {
        status: "success",
        employees_api_url: state.registry().snapshot().employees_api_url,
    })
}

/// POST /api/test-connection
///
/// Only an HTTP 200 from the given URL counts as reachable.
pub async fn probe_api(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ProbeRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let Some(url) = request
        .attendance_api_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
    else {
        return Err(ApiError::validation("API URL is required"));
    };

    let response = state
        .hr()
        .probe(&url)
        .await
        .map_err(|e| ApiError::Upstream(format!("Connection error: {e}")))?;

    if response.status == 200 {
        Ok(Json(StatusMessage::success("Connection successful")))
    } else {
        Err(ApiError::Upstream(format!(
            "API returned status code: {}",
            response.status
        )))
    }
}
