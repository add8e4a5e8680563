//! Fire-and-forget invalidation worker.
//!
//! ```text
//! write path ──try_send──► bounded mpsc ──► InvalidationWorker ──► InvalidationHandler
//!                 │
//!                 └─ full / closed: task dropped, warning logged
//! ```
//!
//! The write path never waits on invalidation and never sees its errors.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::handler::{InvalidationHandler, InvalidationTask};
use crate::model::Store;

/// Default invalidation channel capacity.
pub const DEFAULT_INVALIDATION_CHANNEL_CAPACITY: usize = 1024;

/// Producer side of the invalidation channel.
#[derive(Clone)]
pub struct InvalidationHandle {
    tx: mpsc::Sender<InvalidationTask>,
}

impl InvalidationHandle {
    /// Queue invalidation for a written store.
    ///
    /// Returns false if the task was dropped.
    pub fn on_store_written(&self, store: &Store) -> bool {
        self.submit(InvalidationTask {
            store_id: store.id,
            location: store.location,
        })
    }

    /// Queue an invalidation task without waiting.
    pub fn submit(&self, task: InvalidationTask) -> bool {
        match self.tx.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(task)) => {
                warn!(store_id = %task.store_id, "Invalidation queue full, dropping task");
                false
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                warn!(store_id = %task.store_id, "Invalidation worker stopped, dropping task");
                false
            }
        }
    }
}

/// Consumer side: runs tasks through the handler one at a time.
pub struct InvalidationWorker {
    handler: Arc<InvalidationHandler>,
    rx: mpsc::Receiver<InvalidationTask>,
}

impl InvalidationWorker {
    /// Create a worker and its handle.
    pub fn new(
        handler: Arc<InvalidationHandler>,
        capacity: usize,
    ) -> (Self, InvalidationHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { handler, rx }, InvalidationHandle { tx })
    }

    /// Process tasks until shutdown or until every handle is dropped.
    ///
    /// On shutdown the channel is closed and tasks already queued are
    /// processed before returning.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Invalidation worker starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Invalidation worker shutting down");
                    self.rx.close();
                    while let Some(task) = self.rx.recv().await {
                        self.process(&task).await;
                    }
                    break;
                }

                task = self.rx.recv() => {
                    let Some(task) = task else {
                        info!("Invalidation channel closed");
                        break;
                    };
                    self.process(&task).await;
                }
            }
        }

        info!("Invalidation worker stopped");
    }

    async fn process(&self, task: &InvalidationTask) {
        if let Err(e) = self.handler.handle(task).await {
            error!(store_id = %task.store_id, error = %e, "Cache invalidation failed");
        }
    }
}
