//! Shrinkray Core - bucket-to-bucket image optimization.
//!
//! Shrinkray lists every image under a source prefix, downloads each one,
//! scales it to a fixed width, re-encodes it as JPEG and uploads the result
//! to a destination bucket under a derived key.
//!
//! # Architecture
//!
//! ```text
//! list(prefix) → work queue → N workers: read → transform → write → RunResult
//! ```
//!
//! The object store and the image codec sit behind narrow seams
//! ([`ObjectStore`], [`ImageTransform`]); the [`Coordinator`] owns the
//! worker pool, per-item failure isolation and the completion barrier.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shrinkray_core::{Config, Coordinator, S3Store};
//!
//! #[tokio::main]
//! async fn main() -> shrinkray_core::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = S3Store::connect(&config.store).await;
//!
//!     let result = Coordinator::new(config, Arc::new(store)).run().await?;
//!     println!("{} optimized, {} failed", result.succeeded_count(), result.failed_count());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, ItemError, Result, ShrinkError, StoreError, TransformError};
pub use pipeline::{Coordinator, ImageTransform, ImageTransformer, RunEvent};
pub use store::{MemoryStore, ObjectStore, S3Store};
pub use types::{ImageBytes, ImageKey, ItemFailure, ItemOutcome, ItemStage, RunResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
