//! punch-api - REST API layer of the time-clock gateway
//!
//! Serves device management, user and attendance endpoints over a
//! [`DeviceRegistry`](punch_store::DeviceRegistry) and forwards punches to
//! the HR API.
//!
//! # Usage
//!
//! ```ignore
//! use punch_api::{create_router, AppState};
//!
//! let state = AppState::new(registry, connector, hr);
//! let router = create_router(state);
//! ```

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use extract::{ACTIVE_DEVICE_COOKIE, DEVICE_HEADER};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::{attendance, device_info, devices, settings, stats, sync, users};

/// Create the gateway REST API router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Device data
        .route("/api/device-info", get(device_info::get_device_info))
        .route("/api/stats", get(stats::get_stats))
        // Users
        .route(
            "/api/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/users/{user_id}",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/api/add-users-from-url", post(users::import_users))
        // Attendance
        .route("/api/attendance", get(attendance::list_attendance))
        .route("/api/attendance/summary", get(attendance::attendance_summary))
        .route(
            "/api/attendance/timeline",
            get(attendance::attendance_timeline),
        )
        .route("/api/send-attendance", post(sync::send_attendance))
        // Device registry
        .route(
            "/api/devices",
            get(devices::list_devices).post(devices::add_device),
        )
        .route(
            "/api/devices/{device_id}",
            get(devices::get_device)
                .put(devices::update_device)
                .delete(devices::delete_device),
        )
        .route(
            "/api/devices/{device_id}/set-active",
            post(devices::set_active_device),
        )
        .route(
            "/api/devices/{device_id}/test-connection",
            post(devices::test_device_connection),
        )
        .route("/api/connect", post(devices::connect))
        // HR API settings
        .route("/api/config", get(settings::get_config))
        .route(
            "/api/config-settings",
            get(settings::get_settings).post(settings::save_settings),
        )
        .route(
            "/api/export-config",
            get(settings::get_settings).post(settings::save_settings),
        )
        .route("/api/employees-api-url", get(settings::employees_api_url))
        .route("/api/test-connection", post(settings::probe_api))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use pretty_assertions::assert_eq;
    use punch_forward::{Employee, ForwardResult, HrApi, HrResponse, OutboundRecord};
    use punch_sim::SimulatedConnector;
    use punch_store::{ConfigStore, DeviceRegistry, DeviceSpec};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;

    struct NoHr;

    #[async_trait]
    impl HrApi for NoHr {
        async fn post_batch(&self, _url: &str, _records: &[OutboundRecord]) -> ForwardResult<HrResponse> {
            Ok(HrResponse {
                status: 200,
                body: "{}".to_string(),
            })
        }

        async fn fetch_employees(&self, _url: &str) -> ForwardResult<Vec<Employee>> {
            Ok(Vec::new())
        }

        async fn probe(&self, _url: &str) -> ForwardResult<HrResponse> {
            Ok(HrResponse {
                status: 404,
                body: String::new(),
            })
        }
    }

    fn test_router(dir: &TempDir, with_device: bool) -> Router {
        let registry = DeviceRegistry::open(ConfigStore::new(dir.path().join("config.json")));
        if with_device {
            registry
                .add_or_update("main", DeviceSpec::new("Main", "192.168.1.201"))
                .unwrap();
        }
        let state = AppState::new(
            Arc::new(registry),
            Arc::new(SimulatedConnector::demo()),
            Arc::new(NoHr),
        );
        create_router(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = TempDir::new().unwrap();
        let app = test_router(&dir, false);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let app = test_router(&dir, true);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/users")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn test_empty_registry_reports_no_device() {
        let dir = TempDir::new().unwrap();
        let app = test_router(&dir, false);

        let response = app
            .oneshot(Request::builder().uri("/api/users").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "no_device_registered");
    }

    #[tokio::test]
    async fn test_stats_without_devices_are_zero() {
        let dir = TempDir::new().unwrap();
        let app = test_router(&dir, false);

        let response = app
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({
                "status": "success",
                "data": {
                    "today_attendance": 0,
                    "total_users": 0,
                    "present_today": 0,
                    "last_sync": null,
                }
            })
        );
    }

    #[tokio::test]
    async fn test_probe_non_200_is_error() {
        let dir = TempDir::new().unwrap();
        let app = test_router(&dir, false);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/test-connection")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"attendance_api_url":"http://hr.local"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["message"], "API returned status code: 404");
    }

    #[tokio::test]
    async fn test_unsaved_device_is_not_registered() {
        let dir = TempDir::new().unwrap();
        let app = test_router(&dir, false);
        let path = dir.path().join("config.json");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/devices")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"device_id":"gate","name":"Gate","ip":"192.168.1.201"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "config");

        let response = app
            .oneshot(Request::builder().uri("/api/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["devices"], json!({}));
        assert_eq!(body["active_device"], Value::Null);
    }

    #[tokio::test]
    async fn test_missing_device_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = test_router(&dir, true);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/devices/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
