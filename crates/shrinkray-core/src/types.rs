//! Core data types for the Shrinkray pipeline.
//!
//! A run enumerates [`ImageKey`]s, wraps each in a [`WorkItem`] that moves
//! through the download/transform/upload stages, and folds the terminal
//! [`ItemOutcome`]s into a [`RunResult`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded image bytes. Cheap to clone, never mutated in place.
pub type ImageBytes = bytes::Bytes;

/// Opaque identifier of one object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(String);

impl ImageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prepend `prefix` to this key, keeping the full original key string.
    pub fn with_prefix(&self, prefix: &str) -> ImageKey {
        ImageKey(format!("{prefix}{}", self.0))
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ImageKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ImageKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// The stage a failed item was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStage {
    Download,
    Transform,
    Upload,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStage::Download => write!(f, "download"),
            ItemStage::Transform => write!(f, "transform"),
            ItemStage::Upload => write!(f, "upload"),
        }
    }
}

/// Lifecycle of a work item.
///
/// `Done` and `Failed` are absorbing: once an item reaches either it is
/// consumed into an [`ItemOutcome`] and cannot move again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Downloading,
    Transforming,
    Uploading,
    Done,
    Failed(ItemStage),
}

/// One key travelling through the pipeline, owned by exactly one worker.
#[derive(Debug)]
pub struct WorkItem {
    key: ImageKey,
    state: ItemState,
}

impl WorkItem {
    pub fn new(key: ImageKey) -> Self {
        Self {
            key,
            state: ItemState::Pending,
        }
    }

    pub fn key(&self) -> &ImageKey {
        &self.key
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn start_download(&mut self) {
        debug_assert_eq!(self.state, ItemState::Pending);
        self.state = ItemState::Downloading;
    }

    pub fn start_transform(&mut self) {
        debug_assert_eq!(self.state, ItemState::Downloading);
        self.state = ItemState::Transforming;
    }

    pub fn start_upload(&mut self) {
        debug_assert_eq!(self.state, ItemState::Transforming);
        self.state = ItemState::Uploading;
    }

    /// Terminal success. Consumes the item.
    pub fn complete(mut self, destination: ImageKey) -> ItemOutcome {
        debug_assert_eq!(self.state, ItemState::Uploading);
        self.state = ItemState::Done;
        ItemOutcome::Done(UploadedImage {
            source: self.key,
            destination,
        })
    }

    /// Terminal failure at `stage`. Consumes the item.
    pub fn fail(mut self, stage: ItemStage, reason: impl Into<String>) -> ItemOutcome {
        debug_assert_eq!(self.state, stage.active_state());
        self.state = ItemState::Failed(stage);
        ItemOutcome::Failed(ItemFailure {
            key: self.key,
            stage,
            reason: reason.into(),
        })
    }

    /// Terminal failure at whichever stage was running when processing
    /// unwound. Consumes the item.
    pub fn abort(mut self, reason: impl Into<String>) -> ItemOutcome {
        let stage = match self.state {
            ItemState::Transforming => ItemStage::Transform,
            ItemState::Uploading => ItemStage::Upload,
            _ => ItemStage::Download,
        };
        self.state = ItemState::Failed(stage);
        ItemOutcome::Failed(ItemFailure {
            key: self.key,
            stage,
            reason: reason.into(),
        })
    }
}

impl ItemStage {
    /// The in-progress state an item is in while this stage runs.
    fn active_state(self) -> ItemState {
        match self {
            ItemStage::Download => ItemState::Downloading,
            ItemStage::Transform => ItemState::Transforming,
            ItemStage::Upload => ItemState::Uploading,
        }
    }
}

/// A successfully optimized and uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub source: ImageKey,
    pub destination: ImageKey,
}

/// A key that was skipped, with the stage and underlying cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub key: ImageKey,
    pub stage: ItemStage,
    pub reason: String,
}

/// Terminal state of one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Done(UploadedImage),
    Failed(ItemFailure),
}

impl ItemOutcome {
    /// Source key this outcome belongs to.
    pub fn key(&self) -> &ImageKey {
        match self {
            ItemOutcome::Done(uploaded) => &uploaded.source,
            ItemOutcome::Failed(failure) => &failure.key,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Done(_))
    }
}

/// Aggregate outcome of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Keys returned by enumeration
    pub enumerated: usize,

    /// Items that were downloaded, transformed and uploaded
    pub succeeded: Vec<UploadedImage>,

    /// Items skipped because a stage failed
    pub failed: Vec<ItemFailure>,

    /// Keys never pulled from the queue because the run was cancelled
    pub cancelled: usize,

    /// Whether a cancellation signal cut the run short
    pub interrupted: bool,

    /// Wall-clock time from enumeration to the worker barrier
    pub elapsed_ms: u64,
}

impl RunResult {
    /// Result for a run whose enumeration returned nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fold one terminal outcome into the aggregate.
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Done(uploaded) => self.succeeded.push(uploaded),
            ItemOutcome::Failed(failure) => self.failed.push(failure),
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Number of items that reached a terminal state.
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Every enumerated key reached `Done` or `Failed`.
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.processed() == self.enumerated
    }
}
