//! Shared helpers for the gateway API tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Json;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use punch_api::{create_router, AppState};
use punch_forward::HrClient;
use punch_sim::SimulatedConnector;
use punch_store::{ConfigStore, DeviceRegistry, DeviceSpec};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// An axum server on an ephemeral port that shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// HR API double: refuses batches of more than one record with a 500,
/// accepts single records and serves a fixed employee list
pub fn mock_hr_router() -> Router {
    Router::new()
        .route(
            "/attendance",
            post(|Json(body): Json<Value>| async move {
                let count = body["data"].as_array().map(Vec::len).unwrap_or_default();
                if count > 1 {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": "batch rejected"})),
                    )
                } else {
                    (StatusCode::OK, Json(json!({"ok": true})))
                }
            }),
        )
        .route(
            "/employees",
            get(|| async {
                Json(json!({
                    "data": [
                        {"emp_id": "1001", "fpt_emp_name": "Alice Nguyen"},
                        {"emp_id": "2001", "fpt_emp_name": "Dung Pham"},
                        {"emp_id": "2002", "fpt_emp_name": "Em Vo"},
                        {"fpt_emp_name": "No Id"}
                    ]
                }))
            }),
        )
        .route("/health", get(|| async { "OK" }))
}

/// Gateway under test wired to the demo simulator and a real HR client
pub struct Gateway {
    pub server: TestServer,
    pub connector: SimulatedConnector,
    pub registry: Arc<DeviceRegistry>,
    pub client: reqwest::Client,
    pub config_path: PathBuf,
    _dir: TempDir,
}

impl Gateway {
    /// Gateway with the demo device registered as `main`
    pub async fn with_demo_device() -> Self {
        let gateway = Self::empty().await;
        gateway
            .registry
            .add_or_update("main", DeviceSpec::new("Main", "192.168.1.201"))
            .unwrap();
        gateway
    }

    /// Gateway with no registered devices
    pub async fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        let registry = Arc::new(DeviceRegistry::open(ConfigStore::new(&config_path)));
        let connector = SimulatedConnector::demo();

        let state = AppState::new(
            registry.clone(),
            Arc::new(connector.clone()),
            Arc::new(HrClient::new().unwrap()),
        )
        .with_individual_delay(Duration::ZERO);

        let server = TestServer::start(create_router(state)).await;

        Self {
            server,
            connector,
            registry,
            client: reqwest::Client::new(),
            config_path,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        self.server.url(path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        read(response).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        read(response).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        read(response).await
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        let response = self.client.delete(self.url(path)).send().await.unwrap();
        read(response).await
    }
}

async fn read(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}
