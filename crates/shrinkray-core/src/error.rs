//! Error types for the Shrinkray optimization pipeline.
//!
//! Errors are split by who sees them: `ConfigError` and enumeration failures
//! abort a run, while `ItemError` stays inside the worker that hit it and is
//! recorded against a single key.

use thiserror::Error;

use crate::types::ItemStage;

/// Top-level error type for a Shrinkray run.
#[derive(Error, Debug)]
pub enum ShrinkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listing the source prefix failed; no item was processed
    #[error("Failed to list source images: {0}")]
    Enumeration(#[source] StoreError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is absent or empty
    #[error("Missing required environment variable {0}")]
    Missing(String),

    /// An environment variable is present but cannot be parsed
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },

    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Object store failures, shared by list, read and write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The store could not be reached or answered with a server error
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    /// Credentials were rejected
    #[error("Object store denied access: {0}")]
    Auth(String),

    /// The object body could not be fully transferred
    #[error("Transfer failed for {key}: {message}")]
    Transfer { key: String, message: String },

    /// The destination refused the write for capacity reasons
    #[error("Quota exceeded writing {key}: {message}")]
    QuotaExceeded { key: String, message: String },
}

/// Image decode/encode failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Input is not a recognizable or intact image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Re-encoding the resized image failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// The blocking transform task was cancelled before it finished
    #[error("Transform task aborted: {0}")]
    Aborted(String),
}

/// A failure isolated to one work item, tagged with the stage that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("download failed: {0}")]
    Download(#[source] StoreError),

    #[error("transform failed: {0}")]
    Transform(#[source] TransformError),

    #[error("upload failed: {0}")]
    Upload(#[source] StoreError),
}

impl ItemError {
    /// The pipeline stage this error was raised from.
    pub fn stage(&self) -> ItemStage {
        match self {
            ItemError::Download(_) => ItemStage::Download,
            ItemError::Transform(_) => ItemStage::Transform,
            ItemError::Upload(_) => ItemStage::Upload,
        }
    }
}

/// Convenience type alias for Shrinkray results.
pub type Result<T> = std::result::Result<T, ShrinkError>;

/// Convenience type alias for object store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
