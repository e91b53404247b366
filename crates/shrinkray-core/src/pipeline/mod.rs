//! Image optimization pipeline components.
//!
//! - **transform**: decode, resize and re-encode one image
//! - **queue**: pre-filled multi-consumer work queue
//! - **worker**: download → transform → upload loop for one worker, with
//!   panics contained to the item being processed
//! - **coordinator**: enumerates keys, runs the worker pool, joins results

pub mod coordinator;
pub mod queue;
pub mod transform;
mod worker;

// Re-exports for convenient access
pub use coordinator::Coordinator;
pub use queue::WorkQueue;
pub use transform::{ImageTransform, ImageTransformer};
pub use worker::ProgressCallback;

use crate::types::ItemOutcome;

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    /// Enumeration finished with this many unique keys.
    Enumerated(usize),
    /// An item reached `Done` or `Failed`.
    Finished(&'a ItemOutcome),
}
