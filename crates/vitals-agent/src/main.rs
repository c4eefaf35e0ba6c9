use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vitals_agent::config::AgentConfig;
use vitals_agent::dispatcher;
use vitals_agent::transport::Transport;
use vitals_collector::Collector;
use vitals_common::metric::Snapshot;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vitals=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = AgentConfig::load(&config_path)?;

    tracing::info!(
        server = %config.server_address,
        poll_interval_secs = config.poll_interval_secs,
        rate_limit = config.rate_limit,
        "vitals-agent starting"
    );

    let transport = Arc::new(Transport::from_config(&config)?);
    let cancel = CancellationToken::new();

    let (tx, rx) = mpsc::channel::<Snapshot>(config.queue_capacity);
    let dispatcher = dispatcher::spawn_workers(config.rate_limit, rx, transport, cancel.clone());

    let collection = tokio::spawn(collection_loop(
        Collector::with_default_samplers(),
        tx,
        config.poll_interval_secs,
        cancel.clone(),
    ));

    signal::ctrl_c().await?;
    tracing::info!("shutting down");
    cancel.cancel();

    if let Err(e) = collection.await {
        tracing::error!(error = %e, "collection task panicked");
    }
    dispatcher.shutdown().await;

    Ok(())
}

/// Samples on every poll tick and enqueues the snapshot. A full queue blocks
/// the send and therefore the next tick: backpressure throttles sampling
/// cadence instead of dropping or growing unbounded.
async fn collection_loop(
    mut collector: Collector,
    queue: mpsc::Sender<Snapshot>,
    poll_interval_secs: u64,
    cancel: CancellationToken,
) {
    let mut tick = interval(Duration::from_secs(poll_interval_secs));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("collection loop stopping");
                return;
            }
            _ = tick.tick() => {
                let snapshot = collector.collect();
                tracing::debug!(count = snapshot.len(), "snapshot collected");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = queue.send(snapshot) => {
                        if sent.is_err() {
                            tracing::error!("snapshot queue closed, stopping collection");
                            return;
                        }
                    }
                }
            }
        }
    }
}
