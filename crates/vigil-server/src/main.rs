use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use vigil_collector::{default_collectors, sweep};
use vigil_monitor::MonitoringService;
use vigil_server::app;
use vigil_server::config::ServerConfig;
use vigil_server::state::AppState;
use vigil_storage::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    vigil_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/server.toml");
    let config = if Path::new(config_path).exists() {
        ServerConfig::load(config_path)?
    } else {
        tracing::info!(path = %config_path, "config file not found, using defaults");
        ServerConfig::default()
    };

    let store = Arc::new(SqliteStore::open(Path::new(&config.db_path))?);
    let service = Arc::new(
        MonitoringService::new(store.clone(), store.clone(), store.clone())
            .with_evaluator(config.evaluator()),
    );

    if config.collector.enabled {
        let svc = service.clone();
        let interval = Duration::from_secs(config.collector.interval_secs.max(1));
        let process_metrics = config.collector.process_metrics;
        // Collectors and the SQLite store are synchronous; a plain
        // thread keeps them off the async runtime.
        std::thread::spawn(move || {
            let mut collectors = default_collectors(process_metrics);
            loop {
                let ingested = sweep::run_sweep(&svc, &mut collectors);
                tracing::debug!(ingested, "collection sweep finished");
                std::thread::sleep(interval);
            }
        });
        tracing::info!(
            interval_secs = config.collector.interval_secs,
            "collector loop started"
        );
    }

    let state = AppState {
        service,
        start_time: Utc::now(),
        config: Arc::new(config.clone()),
    };

    let http_app = app::build_http_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!(addr = %addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, http_app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
