//! Bounded background execution.
//!
//! The ingress handler pushes accepted events onto a bounded queue; a
//! fixed set of workers drains it. Two events for the same repository
//! would otherwise race on one working-copy path, so each worker takes a
//! per-repository lock for the whole synchronize-and-analyze window.
//! Events for different repositories still run concurrently, up to the
//! worker count.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tally_ci::Pipeline;
use tally_core::WebhookEvent;

/// One async mutex per working-copy path, created on first use.
#[derive(Default)]
pub struct RepoLocks {
    inner: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for a working-copy path. Callers hold the lock for the
    /// full duration of a pipeline run on that path.
    pub fn lock_for(&self, key: PathBuf) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().expect("repo lock map poisoned");
        map.entry(key).or_default().clone()
    }
}

/// Spawn `worker_count` pipeline workers draining a queue of `capacity`
/// pending events, and return the sender side for the ingress handler.
pub fn start_workers(
    pipeline: Arc<Pipeline>,
    worker_count: usize,
    capacity: usize,
) -> mpsc::Sender<WebhookEvent> {
    let (tx, rx) = mpsc::channel(capacity);
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    let locks = Arc::new(RepoLocks::new());

    for worker_id in 0..worker_count.max(1) {
        let rx = Arc::clone(&rx);
        let pipeline = Arc::clone(&pipeline);
        let locks = Arc::clone(&locks);

        tokio::spawn(async move {
            debug!(worker_id = worker_id, "pipeline worker started");
            loop {
                // Hold the receiver lock only while waiting for the next
                // event, never while processing one.
                let event = { rx.lock().await.recv().await };
                let Some(event) = event else {
                    debug!(worker_id = worker_id, "queue closed, worker exiting");
                    break;
                };

                process_event(worker_id, &pipeline, &locks, event).await;
            }
        });
    }

    tx
}

async fn process_event(
    worker_id: usize,
    pipeline: &Pipeline,
    locks: &RepoLocks,
    event: WebhookEvent,
) {
    // Malformed payloads are dropped here, with a log line and no
    // notification. Only events that classify reach the pipeline.
    let coords = match event.coordinates() {
        Ok(coords) => coords,
        Err(e) => {
            warn!(worker_id = worker_id, error = %e, "dropping unusable webhook payload");
            return;
        }
    };

    info!(
        worker_id = worker_id,
        repo = %coords.repo_url,
        branch = %coords.branch,
        commit = %coords.commit,
        "processing webhook event"
    );

    let lock = locks.lock_for(pipeline.workspace_key(&coords.repo_url));
    let _guard = lock.lock().await;
    pipeline.execute(coords).await;
}
