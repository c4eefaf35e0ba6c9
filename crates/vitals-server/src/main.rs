use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server as TonicServer;
use tracing_subscriber::EnvFilter;
use vitals_common::proto::metrics_server::MetricsServer;
use vitals_server::config::ServerConfig;
use vitals_server::state::AppState;
use vitals_server::{app, grpc};
use vitals_storage::file::FileStorage;
use vitals_storage::memory::MemoryStorage;
use vitals_storage::sqlite::SqliteStorage;
use vitals_storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vitals=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    tracing::info!(
        http = %config.http_address,
        grpc = %config.grpc_address,
        "vitals-server starting"
    );

    let (storage, file_store) = build_storage(&config)?;
    let state = AppState::from_config(storage, &config)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            tracing::info!("shutting down gracefully");
            cancel.cancel();
        });
    }

    let grpc_addr: SocketAddr = config.grpc_address.parse()?;
    let grpc_cancel = cancel.clone();
    let grpc_server = TonicServer::builder()
        .add_service(MetricsServer::new(grpc::MetricsService::new(state.clone())))
        .serve_with_shutdown(grpc_addr, async move { grpc_cancel.cancelled().await });

    let http_addr: SocketAddr = config.http_address.parse()?;
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_cancel = cancel.clone();
    let http_server = axum::serve(http_listener, app::build_http_app(state))
        .with_graceful_shutdown(async move { http_cancel.cancelled().await });

    // Periodic snapshot flush for the file backend
    let flush_handle = match (&file_store, config.store_interval_secs) {
        (Some(store), secs) if secs > 0 => {
            let store = store.clone();
            Some(tokio::spawn(async move {
                let mut tick = interval(Duration::from_secs(secs));
                loop {
                    tick.tick().await;
                    if let Err(e) = store.save() {
                        tracing::error!(error = %e, "state flush failed");
                    }
                }
            }))
        }
        _ => None,
    };

    tracing::info!(grpc = %grpc_addr, http = %http_addr, "server started");

    let (grpc_result, http_result) = tokio::join!(grpc_server, http_server);
    if let Err(e) = grpc_result {
        tracing::error!(error = %e, "gRPC server error");
    }
    if let Err(e) = http_result {
        tracing::error!(error = %e, "HTTP server error");
    }

    if let Some(handle) = flush_handle {
        handle.abort();
    }
    if let Some(store) = file_store {
        if let Err(e) = store.save() {
            tracing::error!(error = %e, "final state flush failed");
        }
    }
    tracing::info!("server stopped");

    Ok(())
}

/// Picks the storage backend: a database path selects SQLite, a snapshot
/// path the file backend, an empty snapshot path leaves state purely in
/// memory. The file backend is returned separately so the flush task and
/// the shutdown path can reach [`FileStorage::save`].
fn build_storage(config: &ServerConfig) -> Result<(Arc<dyn Storage>, Option<Arc<FileStorage>>)> {
    if let Some(path) = &config.database_path {
        tracing::info!(path = %path.display(), "using sqlite storage");
        return Ok((Arc::new(SqliteStorage::new(path)?), None));
    }
    if config.file_storage_path.is_empty() {
        tracing::info!("using in-memory storage");
        return Ok((Arc::new(MemoryStorage::new()), None));
    }

    let store = Arc::new(FileStorage::new(&config.file_storage_path));
    if config.restore {
        if let Err(e) = store.restore() {
            tracing::warn!(error = %e, "could not restore saved state, starting empty");
        }
    }
    tracing::info!(path = %config.file_storage_path, "using file storage");
    Ok((store.clone(), Some(store)))
}
