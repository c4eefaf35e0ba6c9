use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vitals_common::metric::Snapshot;

/// Backoff before each retry attempt, in seconds. Three attempts total
/// including the first; the sleep after the final failure is skipped.
const RETRY_SCHEDULE_SECS: [u64; 3] = [1, 3, 5];

/// Handle over the running worker pool. [`DispatcherHandle::shutdown`]
/// joins the workers and drains whatever the queue still holds.
pub struct DispatcherHandle {
    workers: Vec<JoinHandle<()>>,
    queue: Arc<Mutex<mpsc::Receiver<Snapshot>>>,
}

impl DispatcherHandle {
    /// Waits for every worker to finish its in-flight delivery, then drains
    /// and counts the snapshots that never made it out. Queued work is
    /// dropped by design; the returned count makes the loss observable.
    pub async fn shutdown(self) -> usize {
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
        let mut queue = self.queue.lock().await;
        queue.close();
        let mut dropped = 0usize;
        while queue.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, "snapshots still queued at shutdown were dropped");
        }
        dropped
    }
}

/// Starts exactly `rate_limit` worker loops sharing the snapshot queue.
/// The queue is the only shared mutable resource; each worker owns the
/// snapshot it is currently delivering.
pub fn spawn_workers(
    rate_limit: usize,
    queue: mpsc::Receiver<Snapshot>,
    transport: Arc<Transport>,
    cancel: CancellationToken,
) -> DispatcherHandle {
    let queue = Arc::new(Mutex::new(queue));
    let workers = (0..rate_limit)
        .map(|worker| {
            tokio::spawn(worker_loop(
                worker,
                queue.clone(),
                transport.clone(),
                cancel.clone(),
            ))
        })
        .collect();
    DispatcherHandle { workers, queue }
}

async fn worker_loop(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<Snapshot>>>,
    transport: Arc<Transport>,
    cancel: CancellationToken,
) {
    loop {
        let snapshot = {
            let mut queue = queue.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker, "worker stopping");
                    return;
                }
                next = queue.recv() => match next {
                    Some(snapshot) => snapshot,
                    None => return,
                },
            }
        };
        deliver_with_retry(worker, &transport, &cancel, &snapshot).await;
    }
}

/// Drives one snapshot to completion: up to three attempts with 1s/3s
/// backoff in between. On cancellation the in-flight attempt completes but
/// remaining backoff sleeps are abandoned.
pub async fn deliver_with_retry(
    worker: usize,
    transport: &Transport,
    cancel: &CancellationToken,
    snapshot: &Snapshot,
) {
    for (attempt, backoff) in RETRY_SCHEDULE_SECS.iter().enumerate() {
        match transport.deliver(snapshot).await {
            Ok(()) => {
                tracing::debug!(worker, count = snapshot.len(), "snapshot delivered");
                return;
            }
            Err(e) if attempt + 1 == RETRY_SCHEDULE_SECS.len() => {
                tracing::error!(worker, error = %e, count = snapshot.len(),
                    "all delivery attempts failed, dropping snapshot");
                return;
            }
            Err(e) => {
                tracing::warn!(worker, error = %e, retry_in_secs = backoff,
                    "delivery failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::warn!(worker, "cancelled during backoff, dropping snapshot");
                        return;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(*backoff)) => {}
                }
            }
        }
    }
}
