//! punchd - time-clock gateway daemon
//!
//! Serves the REST API over the registered attendance devices and forwards
//! punches to the HR API.
//!
//! Usage:
//!   punchd [--config punchd.toml] [--listen ADDR] [--data-dir DIR]
//!          [--fixture devices.toml] [--log-json]
//!
//! Without a fixture, one demo device is simulated at 192.168.1.201:4370.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use punch_api::{create_router, AppState};
use punch_core::DeviceConnector;
use punch_forward::HrClient;
use punch_sim::SimulatedConnector;
use punch_store::{ConfigStore, DeviceRegistry};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DaemonConfig;

const DEFAULT_LOG_FILTER: &str =
    "punchd=info,punch_api=info,punch_store=info,punch_forward=info,punch_sim=debug";

#[derive(Parser)]
#[command(name = "punchd")]
#[command(author, version, about = "Time-clock gateway daemon")]
struct Args {
    /// Daemon config file (TOML)
    #[arg(short, long, env = "PUNCHD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides [server] listen
    #[arg(short, long, env = "PUNCHD_LISTEN")]
    listen: Option<String>,

    /// Directory holding config.json when no explicit path is configured
    #[arg(short, long, env = "PUNCHD_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Simulated device fixture (TOML), overrides [simulator] fixture
    #[arg(short, long, env = "PUNCHD_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, env = "PUNCHD_LOG_JSON")]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    tracing::info!("Starting punchd (time-clock gateway)");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config");
            DaemonConfig::load(path)?
        }
        None => DaemonConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(fixture) = args.fixture {
        config.simulator.fixture = Some(fixture);
    }

    // Device registry over the JSON config document
    let config_path = config.config_path(&args.data_dir);
    let mut store = ConfigStore::new(&config_path);
    if let Some(legacy) = &config.storage.legacy_devices_path {
        store = store.with_legacy_devices(legacy);
    }
    let registry = Arc::new(DeviceRegistry::open(store));
    tracing::info!(
        path = %config_path.display(),
        devices = registry.devices().len(),
        "Device registry loaded"
    );

    // Device connector
    let connector: Arc<dyn DeviceConnector> = match &config.simulator.fixture {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading simulated devices");
            Arc::new(
                SimulatedConnector::from_fixture(path)
                    .with_context(|| format!("Failed to load fixture: {}", path.display()))?,
            )
        }
        None => {
            tracing::info!("No fixture provided, simulating the demo device");
            Arc::new(SimulatedConnector::demo())
        }
    };

    // HR API client
    let hr = HrClient::with_config(&config.forward.client_config())
        .context("Failed to build HR API client")?;

    let state = AppState::new(registry.clone(), connector, Arc::new(hr))
        .with_device_code(&config.forward.device_code)
        .with_individual_delay(config.forward.individual_delay());

    let app = create_router(state);

    let addr = config.listen_addr()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry
        .persist()
        .context("Failed to save device registry on shutdown")?;
    tracing::info!("punchd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
