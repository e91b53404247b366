//! Pipeline coordination: enumerate, fan out to a fixed worker pool, join.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use super::queue::WorkQueue;
use super::transform::{ImageTransform, ImageTransformer};
use super::worker::{ProgressCallback, Worker};
use super::RunEvent;
use crate::config::Config;
use crate::error::{Result, ShrinkError};
use crate::store::ObjectStore;
use crate::types::{ImageKey, RunResult};

/// Drives one optimization run over every image under the source prefix.
///
/// Enumeration failures abort the run. Failures of individual images are
/// logged and recorded in the [`RunResult`]; they never stop other workers.
pub struct Coordinator {
    config: Arc<Config>,
    store: Arc<dyn ObjectStore>,
    transformer: Arc<dyn ImageTransform>,
    progress: Option<ProgressCallback>,
}

impl Coordinator {
    /// Create a coordinator over `store` with the given configuration.
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let transformer = Arc::new(ImageTransformer::new(config.transform.clone()));
        Self {
            config: Arc::new(config),
            store,
            transformer,
            progress: None,
        }
    }

    /// Replace the default [`ImageTransformer`] built from `config.transform`.
    pub fn with_transformer(mut self, transformer: Arc<dyn ImageTransform>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Register a callback for enumeration and per-item completion events.
    ///
    /// Called from worker tasks, so it must be cheap and thread-safe.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(RunEvent<'_>) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run to completion.
    pub async fn run(&self) -> Result<RunResult> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Run until the queue drains or `cancel` fires.
    ///
    /// On cancellation, workers finish the item they hold and stop pulling;
    /// the result lists everything that reached a terminal state and counts
    /// the keys that were never started.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<RunResult> {
        let start = Instant::now();

        let keys = self.enumerate().await?;
        let enumerated = keys.len();
        if let Some(progress) = &self.progress {
            progress(RunEvent::Enumerated(enumerated));
        }

        let Some(queue) = WorkQueue::filled(keys) else {
            tracing::info!(
                "No images found under {:?}. Nothing to do.",
                self.config.store.source_prefix
            );
            return Ok(RunResult::empty());
        };

        let worker_count = self.config.processing.parallel_workers.max(1);
        tracing::info!("Processing {enumerated} image(s) with {worker_count} worker(s)");

        let handles: Vec<_> = (0..worker_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    config: self.config.clone(),
                    store: self.store.clone(),
                    transformer: self.transformer.clone(),
                    queue: queue.clone(),
                    cancel: cancel.clone(),
                    progress: self.progress.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        // Barrier: every worker has seen the queue drain (or the cancel
        // signal) and returned its local outcomes.
        let mut result = RunResult {
            enumerated,
            ..RunResult::default()
        };
        for (id, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(outcomes) => outcomes.into_iter().for_each(|o| result.record(o)),
                Err(e) => tracing::error!("Worker {id} terminated abnormally: {e}"),
            }
        }

        result.cancelled = queue.remaining().await;
        result.interrupted = cancel.is_cancelled() && result.processed() < enumerated;
        result.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if result.interrupted {
            tracing::warn!(
                "Run cancelled: {} of {} image(s) never started",
                result.cancelled,
                enumerated
            );
        }
        tracing::info!(
            "Run finished in {:?}: {} succeeded, {} failed, {} enumerated",
            start.elapsed(),
            result.succeeded_count(),
            result.failed_count(),
            enumerated
        );

        Ok(result)
    }

    /// List source keys, dropping any the store reports twice.
    async fn enumerate(&self) -> Result<Vec<ImageKey>> {
        let prefix = &self.config.store.source_prefix;
        tracing::info!(
            "Listing images under {:?} in {} via {}",
            prefix,
            self.config.store.source_bucket,
            self.store.name()
        );

        let listed = self
            .store
            .list(prefix)
            .await
            .map_err(ShrinkError::Enumeration)?;

        let mut seen = HashSet::with_capacity(listed.len());
        let keys: Vec<ImageKey> = listed
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();
        tracing::debug!("Enumerated {} unique key(s)", keys.len());
        Ok(keys)
    }
}
