//! A single worker: pull a key, download, transform, upload, repeat.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use super::queue::WorkQueue;
use super::transform::ImageTransform;
use super::RunEvent;
use crate::config::Config;
use crate::error::{ItemError, TransformError};
use crate::store::ObjectStore;
use crate::types::{ImageBytes, ImageKey, ItemOutcome, WorkItem};

/// Callback fired as the run progresses.
pub type ProgressCallback = Arc<dyn Fn(RunEvent<'_>) + Send + Sync>;

/// Everything a worker shares with its siblings.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) config: Arc<Config>,
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) transformer: Arc<dyn ImageTransform>,
    pub(crate) queue: WorkQueue,
    pub(crate) cancel: CancellationToken,
    pub(crate) progress: Option<ProgressCallback>,
}

impl Worker {
    /// Drain the queue, returning this worker's outcomes.
    ///
    /// Stops early when `cancel` fires; an item already taken is still
    /// carried to a terminal state.
    pub(crate) async fn run(self) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Worker {} stopping: run cancelled", self.id);
                    break;
                }
                next = self.queue.next() => next,
            };
            let Some(item) = next else {
                break;
            };

            let outcome = self.process(item).await;
            self.report(&outcome);
            outcomes.push(outcome);
        }

        tracing::debug!("Worker {} exiting after {} item(s)", self.id, outcomes.len());
        outcomes
    }

    /// Carry one item to `Done` or `Failed`. A panic anywhere in its stages
    /// fails the item instead of taking the worker down.
    async fn process(&self, mut item: WorkItem) -> ItemOutcome {
        let start = Instant::now();
        let attempt = AssertUnwindSafe(self.try_process(&mut item))
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(destination)) => {
                tracing::info!(
                    "Uploaded {} -> {} in {:?}",
                    item.key(),
                    destination,
                    start.elapsed()
                );
                item.complete(destination)
            }
            Ok(Err(err)) => {
                let stage = err.stage();
                tracing::error!(
                    key = %item.key(),
                    stage = %stage,
                    reason = %err,
                    "Skipping image"
                );
                item.fail(stage, err.to_string())
            }
            Err(panic) => {
                let reason = format!("panicked: {}", panic_message(&*panic));
                tracing::error!(
                    key = %item.key(),
                    state = ?item.state(),
                    reason = %reason,
                    "Skipping image"
                );
                item.abort(reason)
            }
        }
    }

    async fn try_process(&self, item: &mut WorkItem) -> Result<ImageKey, ItemError> {
        item.start_download();
        let download_start = Instant::now();
        let raw = self
            .store
            .read(item.key())
            .await
            .map_err(ItemError::Download)?;
        tracing::debug!(
            "  Download {}: {} bytes in {:?}",
            item.key(),
            raw.len(),
            download_start.elapsed()
        );

        item.start_transform();
        let transform_start = Instant::now();
        let optimized = self.transform(raw).await.map_err(ItemError::Transform)?;
        tracing::debug!(
            "  Transform {}: {} bytes in {:?}",
            item.key(),
            optimized.len(),
            transform_start.elapsed()
        );

        item.start_upload();
        let destination = self.config.destination_key(item.key());
        self.store
            .write(&destination, optimized)
            .await
            .map_err(ItemError::Upload)?;

        Ok(destination)
    }

    /// Run the CPU-bound transform off the async executor.
    async fn transform(&self, raw: ImageBytes) -> Result<ImageBytes, TransformError> {
        let transformer = self.transformer.clone();
        match tokio::task::spawn_blocking(move || transformer.transform(&raw)).await {
            Ok(result) => result,
            // Re-raised here so `process` records it like any other panic.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(TransformError::Aborted(e.to_string())),
        }
    }

    /// Forward a terminal outcome to the progress callback, if any.
    fn report(&self, outcome: &ItemOutcome) {
        let Some(progress) = &self.progress else {
            return;
        };
        let delivered =
            std::panic::catch_unwind(AssertUnwindSafe(|| progress(RunEvent::Finished(outcome))));
        if let Err(panic) = delivered {
            tracing::warn!(
                "Progress callback panicked on {}: {}",
                outcome.key(),
                panic_message(&*panic)
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
