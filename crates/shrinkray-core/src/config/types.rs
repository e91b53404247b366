//! Sub-configuration structs with defaults matching the reference deployment.

use serde::{Deserialize, Serialize};

/// Source and destination bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bucket images are listed and read from
    pub source_bucket: String,

    /// Bucket optimized images are written to
    pub destination_bucket: String,

    /// Only keys under this prefix are enumerated
    pub source_prefix: String,

    /// Prepended to each source key to build the destination key
    pub destination_prefix: String,

    /// Custom endpoint for S3-compatible stores (MinIO, local emulators)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Region override; falls back to the AWS default provider chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Use path-style addressing (`endpoint/bucket/key`)
    pub force_path_style: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            source_bucket: String::new(),
            destination_bucket: String::new(),
            source_prefix: "uuid/".to_string(),
            destination_prefix: "optimized/".to_string(),
            endpoint_url: None,
            region: None,
            force_path_style: false,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of parallel workers pulling from the work queue
    pub parallel_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 3,
        }
    }
}

/// Resize and re-encode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Output width in pixels; height follows the source aspect ratio
    pub target_width: u32,

    /// JPEG quality (1-100)
    pub quality: u8,

    /// Decoded images wider or taller than this are rejected
    pub max_image_dimension: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            target_width: 800,
            quality: 80,
            max_image_dimension: 20_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
