//! End-to-end tests for the gateway API
//!
//! Every test runs the real router on an ephemeral port against the demo
//! simulator. Forwarding tests also run a mock HR API.

mod common;

use chrono::Local;
use common::{mock_hr_router, Gateway, TestServer};
use pretty_assertions::assert_eq;
use punch_api::{ACTIVE_DEVICE_COOKIE, DEVICE_HEADER};
use punch_core::DATE_FORMAT;
use punch_sim::SimDevice;
use punch_store::DeviceSpec;
use serde_json::json;

fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

fn yesterday() -> String {
    let today = Local::now().date_naive();
    today.pred_opt().unwrap_or(today).format(DATE_FORMAT).to_string()
}

// =============================================================================
// Device resolution
// =============================================================================

#[tokio::test]
async fn test_empty_registry_is_no_device_registered() {
    let gw = Gateway::empty().await;

    for path in ["/api/users", "/api/attendance", "/api/device-info"] {
        let (status, body) = gw.get(path).await;
        assert_eq!(status, 400, "{path}");
        assert_eq!(body["error"], "no_device_registered", "{path}");
    }
}

#[tokio::test]
async fn test_header_beats_cookie_beats_stored() {
    let gw = Gateway::with_demo_device().await;
    gw.connector.insert(
        "10.0.0.2",
        4370,
        SimDevice::new("SECOND").with_user(1, "77", "Other Person"),
    );
    gw.connector
        .insert("10.0.0.3", 4370, SimDevice::new("THIRD").with_user(1, "88", "Third Person"));
    gw.registry
        .add_or_update("second", DeviceSpec::new("Second", "10.0.0.2"))
        .unwrap();
    gw.registry
        .add_or_update("third", DeviceSpec::new("Third", "10.0.0.3"))
        .unwrap();
    gw.registry.set_active("main").unwrap();

    let user_ids = |body: &serde_json::Value| -> Vec<String> {
        body["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap().to_string())
            .collect()
    };

    // stored selection
    let (_, body) = gw.get("/api/users").await;
    assert!(user_ids(&body).contains(&"1001".to_string()));

    // cookie overrides stored
    let response = gw
        .client
        .get(gw.url("/api/users"))
        .header("cookie", format!("{ACTIVE_DEVICE_COOKIE}=third"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(user_ids(&body), vec!["88"]);

    // header overrides cookie
    let response = gw
        .client
        .get(gw.url("/api/users"))
        .header(DEVICE_HEADER, "second")
        .header("cookie", format!("{ACTIVE_DEVICE_COOKIE}=third"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(user_ids(&body), vec!["77"]);
}

#[tokio::test]
async fn test_set_active_sets_cookie() {
    let gw = Gateway::with_demo_device().await;

    let response = gw
        .client
        .post(gw.url("/api/devices/main/set-active"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("active_device=main"), "{cookie}");
    assert_eq!(gw.registry.active_device().as_deref(), Some("main"));

    let (status, body) = gw.post("/api/devices/ghost/set-active", json!({})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");
}

// =============================================================================
// Device registry
// =============================================================================

#[tokio::test]
async fn test_device_crud() {
    let gw = Gateway::empty().await;

    let (status, body) = gw
        .post(
            "/api/devices",
            json!({"device_id": "front", "name": "Front Door", "ip": "192.168.1.201", "port": "4370"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(gw.registry.active_device().as_deref(), Some("front"));

    // unreachable device is kept with a warning
    let (status, body) = gw
        .post(
            "/api/devices",
            json!({"device_id": "back", "name": "Back Door", "ip": "10.9.9.9"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "warning");

    let (_, body) = gw.get("/api/devices").await;
    let ids: Vec<&String> = body["devices"].as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["front", "back"]);
    assert_eq!(body["active_device"], "front");

    let (status, body) = gw.put("/api/devices/back", json!({"name": "Loading Bay"})).await;
    assert_eq!(status, 200, "{body}");
    let (_, body) = gw.get("/api/devices/back").await;
    assert_eq!(body["device"]["name"], "Loading Bay");
    assert_eq!(body["device"]["ip"], "10.9.9.9");

    let (status, _) = gw.delete("/api/devices/back").await;
    assert_eq!(status, 200);
    let (status, _) = gw.delete("/api/devices/back").await;
    assert_eq!(status, 404);

    let (status, body) = gw.post("/api/devices", json!({"name": "No Id"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation");

    // the document on disk follows every change
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&gw.config_path).unwrap()).unwrap();
    assert_eq!(saved["registered_devices"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_device_test_connection() {
    let gw = Gateway::with_demo_device().await;

    let (status, _) = gw.post("/api/devices/main/test-connection", json!({})).await;
    assert_eq!(status, 200);

    gw.connector.set_reachable("192.168.1.201", 4370, false);
    let (status, body) = gw.post("/api/devices/main/test-connection", json!({})).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "connection_failed");
}

#[tokio::test]
async fn test_connect_registers_and_rolls_back() {
    let gw = Gateway::empty().await;

    let (status, body) = gw
        .post("/api/connect", json!({"device_ip": "192.168.1.201", "device_port": 4370}))
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["device_info"]["users"], 4);
    assert_eq!(body["device_info"]["attendance"], 8);
    assert_eq!(body["device_info"]["serial_number"], "DEMO0000001");
    let id = body["device_id"].as_str().unwrap().to_string();
    assert!(id.starts_with("device_"));
    assert_eq!(gw.registry.active_device(), Some(id));

    let (status, body) = gw.post("/api/connect", json!({"device_ip": "10.9.9.9"})).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "connection_failed");
    assert_eq!(gw.registry.devices().len(), 1);
}

// =============================================================================
// Users and attendance
// =============================================================================

#[tokio::test]
async fn test_user_lifecycle() {
    let gw = Gateway::with_demo_device().await;

    let (status, body) = gw
        .post("/api/users", json!({"user_id": 4242, "name": "New Hire"}))
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["uid"], 5);

    let (status, body) = gw.get("/api/users/4242").await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["name"], "New Hire");
    assert_eq!(body["punch_count"], 0);
    assert!(body["user"].get("password").is_none());

    let (status, _) = gw.delete("/api/users/4242").await;
    assert_eq!(status, 200);
    let (status, body) = gw.delete("/api/users/4242").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_failed_handler_releases_device() {
    let gw = Gateway::with_demo_device().await;

    let (status, _) = gw.get("/api/users/nobody").await;
    assert_eq!(status, 404);
    let (status, _) = gw.delete("/api/users/nobody").await;
    assert_eq!(status, 404);

    assert_eq!(gw.connector.open_sessions(), 0);
    assert!(gw.connector.connect_count() >= 2);
}

#[tokio::test]
async fn test_attendance_views() {
    let gw = Gateway::with_demo_device().await;
    let yesterday = yesterday();

    let (status, body) = gw
        .get(&format!(
            "/api/attendance?start_date={yesterday}&end_date={yesterday}&emp_no=1001"
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 4);
    assert_eq!(body["attendance"][0]["punch"], "1");

    let (_, body) = gw
        .get(&format!("/api/attendance/summary?start_date={yesterday}&end_date={yesterday}"))
        .await;
    assert_eq!(
        body["data"]["1001"][&yesterday],
        json!({"check_in": "08:02:00", "check_out": "17:30:00"})
    );
    assert_eq!(
        body["data"]["1002"][&yesterday],
        json!({"check_in": "07:55:00", "check_out": "16:45:00"})
    );

    let (_, body) = gw
        .get(&format!("/api/attendance/timeline?start_date={yesterday}&emp_no=1001"))
        .await;
    let day = body["data"]["1001"][&yesterday].as_array().unwrap();
    let times: Vec<&str> = day.iter().map(|e| e["time"].as_str().unwrap()).collect();
    assert_eq!(times, vec!["08:02:00", "12:00:00", "13:01:00", "17:30:00"]);

    let (status, body) = gw.get("/api/attendance?start_date=yesterday").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_stats_count_today() {
    let gw = Gateway::with_demo_device().await;

    let (status, body) = gw.get("/api/stats").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["today_attendance"], 2);
    assert_eq!(body["data"]["present_today"], 2);
    assert_eq!(body["data"]["total_users"], 4);
}

// =============================================================================
// HR API
// =============================================================================

#[tokio::test]
async fn test_send_attendance_falls_back_to_single_records() {
    let hr = TestServer::start(mock_hr_router()).await;
    let gw = Gateway::with_demo_device().await;

    let (status, _) = gw
        .post(
            "/api/config-settings",
            json!({"base_api_url": hr.url("/"), "api_token": "secret"}),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = gw
        .post(
            "/api/send-attendance",
            json!({"start_date": yesterday(), "end_date": today()}),
        )
        .await;

    assert_eq!(status, 200, "{body}");
    assert_eq!(body["status"], "partial_success");
    assert_eq!(body["records_sent"], 8);
    assert_eq!(body["total_records"], 8);
    assert_eq!(body["records_failed"], 0);

    let config = gw.registry.snapshot();
    let last = config.last_successful_send.unwrap();
    assert_eq!(last.last_send_data.count, 8);
    assert_eq!(last.last_send_data.records_preview.len(), 8);

    let (_, stats) = gw.get("/api/stats").await;
    assert!(stats["data"]["last_sync"].is_string());
}

#[tokio::test]
async fn test_send_attendance_validates_input() {
    let gw = Gateway::with_demo_device().await;

    let (status, _) = gw.post("/api/send-attendance", json!({"start_date": today()})).await;
    assert_eq!(status, 400);

    let (status, body) = gw
        .post(
            "/api/send-attendance",
            json!({"start_date": today(), "end_date": today()}),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("No API URL configured"));
}

#[tokio::test]
async fn test_import_users_from_hr() {
    let hr = TestServer::start(mock_hr_router()).await;
    let gw = Gateway::with_demo_device().await;

    let (status, body) = gw
        .post(
            "/api/add-users-from-url",
            json!({"url": hr.url("/employees")}),
        )
        .await;

    assert_eq!(status, 200, "{body}");
    assert_eq!(body["success_count"], 2);
    assert_eq!(body["skipped_count"], 1);
    assert_eq!(body["failed_count"], 1);
    assert_eq!(body["message"], "Added 2 out of 4 users to the device");

    let device = gw.connector.device("192.168.1.201", 4370).unwrap();
    let mut uids: Vec<u16> = device
        .users
        .iter()
        .filter(|u| u.user_id.starts_with("200"))
        .map(|u| u.uid)
        .collect();
    uids.sort();
    assert_eq!(uids, vec![5, 6]);
}

#[tokio::test]
async fn test_settings_derive_urls() {
    let gw = Gateway::empty().await;

    let (status, body) = gw
        .post(
            "/api/export-config",
            json!({"base_api_url": "https://hr.example.com/api/", "api_token": "abc"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Configuration saved successfully");

    let (_, body) = gw.get("/api/config-settings").await;
    assert_eq!(
        body["config"]["attendance_api_url"],
        "https://hr.example.com/api/attendance?token=abc"
    );
    let (_, body) = gw.get("/api/employees-api-url").await;
    assert_eq!(
        body["employees_api_url"],
        "https://hr.example.com/api/employees?token=abc"
    );

    let (status, _) = gw
        .post("/api/config-settings", json!({"base_api_url": "https://x"}))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_probe_hr_api() {
    let hr = TestServer::start(mock_hr_router()).await;
    let gw = Gateway::empty().await;

    let (status, body) = gw
        .post("/api/test-connection", json!({"attendance_api_url": hr.url("/health")}))
        .await;
    assert_eq!(status, 200, "{body}");

    let (status, _) = gw.post("/api/test-connection", json!({})).await;
    assert_eq!(status, 400);
}
