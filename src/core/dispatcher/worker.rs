//! Worker pool consuming the request stream

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use super::Dispatcher;
use crate::core::requests::Request;
use crate::core::stream::{MessageLog, subscribe};

/// Pause after a stream read error before reading again
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Handles of the spawned workers
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to finish its current request and exit
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }
    }
}

/// Spawn `count` workers in consumer `group`. Each holds at most one
/// unacknowledged message and exits once `shutdown` flips to `true`.
pub fn spawn_workers(
    dispatcher: Arc<Dispatcher>,
    log: Arc<dyn MessageLog<Request>>,
    group: &str,
    count: usize,
    block: Duration,
    shutdown: watch::Receiver<bool>,
) -> WorkerPool {
    // Consumer names must be unique across processes sharing the group
    let instance = Uuid::new_v4().simple().to_string();
    let handles = (0..count)
        .map(|index| {
            let consumer = format!("worker-{}-{}", &instance[..8], index);
            tokio::spawn(run_worker(
                Arc::clone(&dispatcher),
                Arc::clone(&log),
                group.to_string(),
                consumer,
                block,
                shutdown.clone(),
            ))
        })
        .collect();

    info!(workers = count, group, "Dispatcher workers started");
    WorkerPool { handles }
}

async fn run_worker(
    dispatcher: Arc<Dispatcher>,
    log: Arc<dyn MessageLog<Request>>,
    group: String,
    consumer: String,
    block: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let deliveries = subscribe(log, group, consumer.clone(), block);
    futures::pin_mut!(deliveries);

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            next = deliveries.next() => match next {
                Some(Ok(delivery)) => {
                    if let Err(e) = dispatcher.handle(delivery).await {
                        error!(consumer = %consumer, "Failed to acknowledge request: {}", e);
                    }
                }
                Some(Err(e)) => {
                    error!(consumer = %consumer, "Request stream read failed: {}", e);
                    tokio::time::sleep(READ_ERROR_BACKOFF).await;
                }
                None => break,
            }
        }
    }

    info!(consumer = %consumer, "Worker stopped");
}
