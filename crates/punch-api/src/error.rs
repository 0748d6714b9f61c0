//! API error types and conversions

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use punch_core::DeviceError;
use punch_forward::ForwardError;
use punch_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// API error type that converts to HTTP responses
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 - the registry is empty
    #[error("{0}")]
    NoDeviceRegistered(String),
    /// 400 - devices exist but none could be selected
    #[error("{0}")]
    NoActiveDevice(String),
    /// 503 - the device did not answer
    #[error("{0}")]
    ConnectionFailed(String),
    /// 404
    #[error("{0}")]
    NotFound(String),
    /// 400 - bad input
    #[error("{0}")]
    Validation(String),
    /// 502 - HR API or device answered with an error
    #[error("{0}")]
    Upstream(String),
    /// 500 - config document could not be written
    #[error("{0}")]
    Config(String),
    /// 500
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoDeviceRegistered(_)
            | ApiError::NoActiveDevice(_)
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Config(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NoDeviceRegistered(_) => "no_device_registered",
            ApiError::NoActiveDevice(_) => "no_active_device",
            ApiError::ConnectionFailed(_) => "connection_failed",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::Upstream(_) => "upstream",
            ApiError::Config(_) => "config",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.kind();
        let message = self.to_string();

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(error, %message, "API error");
        } else {
            tracing::debug!(error, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            status: "error",
            error,
            message,
        });

        (status, body).into_response()
    }
}

impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::ConnectionFailed(msg) => {
                ApiError::ConnectionFailed(format!("Error connecting to device: {msg}"))
            }
            DeviceError::Timeout(secs) => {
                ApiError::ConnectionFailed(format!("Device did not answer within {secs}s"))
            }
            DeviceError::NotFound(msg) => ApiError::NotFound(format!("{msg} not found")),
            DeviceError::InvalidRequest(msg) => ApiError::Validation(msg),
            DeviceError::Protocol(msg) => ApiError::Upstream(format!("Device error: {msg}")),
            DeviceError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DeviceNotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::NoDeviceRegistered => ApiError::NoDeviceRegistered(err.to_string()),
            StoreError::NoActiveDevice => ApiError::NoActiveDevice(err.to_string()),
            StoreError::Io { .. } | StoreError::Serialize(_) => {
                ApiError::Config(format!("Failed to save configuration: {err}"))
            }
            StoreError::Device(e) => e.into(),
        }
    }
}

impl From<ForwardError> for ApiError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::InvalidUrl(e) => ApiError::Validation(format!("Invalid API URL: {e}")),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StoreError::NoDeviceRegistered, StatusCode::BAD_REQUEST, "no_device_registered")]
    #[case(StoreError::NoActiveDevice, StatusCode::BAD_REQUEST, "no_active_device")]
    #[case(StoreError::DeviceNotFound("x".into()), StatusCode::NOT_FOUND, "not_found")]
    #[case(
        StoreError::Device(DeviceError::ConnectionFailed("refused".into())),
        StatusCode::SERVICE_UNAVAILABLE,
        "connection_failed"
    )]
    #[case(
        StoreError::Device(DeviceError::Timeout(5)),
        StatusCode::SERVICE_UNAVAILABLE,
        "connection_failed"
    )]
    fn test_store_error_mapping(
        #[case] err: StoreError,
        #[case] status: StatusCode,
        #[case] kind: &str,
    ) {
        let api: ApiError = err.into();
        assert_eq!(api.status_code(), status);
        assert_eq!(api.kind(), kind);
    }

    #[test]
    fn test_forward_error_mapping() {
        let err: ApiError = ForwardError::Status {
            status: 500,
            body: "boom".into(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
