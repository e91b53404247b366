//! Configuration management for Shrinkray.
//!
//! A run is configured entirely from its environment. An optional TOML file
//! named by `SHRINKRAY_CONFIG` provides a base, environment variables override
//! it, and the merged result is validated before anything touches the store.
//! Pipeline code only ever sees the resulting [`Config`] value.

mod env;
mod types;
mod validate;

pub use env::{
    CONFIG_FILE_VAR, DESTINATION_BUCKET_VAR, DESTINATION_LOCATION_VAR, SOURCE_BUCKET_VAR,
    SOURCE_LOCATION_VAR,
};
pub use types::*;

use crate::error::ConfigError;
use crate::types::ImageKey;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure for Shrinkray.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bucket and key layout
    pub store: StoreConfig,

    /// Worker pool settings
    pub processing: ProcessingConfig,

    /// Resize/re-encode settings
    pub transform: TransformConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Build and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse a TOML config file.
    ///
    /// The result is not validated: bucket names usually arrive later from
    /// the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Destination key for a source key: the destination prefix followed by
    /// the complete source key.
    pub fn destination_key(&self, key: &ImageKey) -> ImageKey {
        key.with_prefix(&self.store.destination_prefix)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing.parallel_workers, 3);
        assert_eq!(config.transform.target_width, 800);
        assert_eq!(config.transform.quality, 80);
        assert_eq!(config.store.source_prefix, "uuid/");
        assert_eq!(config.store.destination_prefix, "optimized/");
    }

    #[test]
    fn test_destination_key() {
        let config = Config::default();
        let key = ImageKey::from("uuid/b.jpg");
        assert_eq!(config.destination_key(&key).as_str(), "optimized/uuid/b.jpg");
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[store]"));
        assert!(toml.contains("[processing]"));
        assert!(toml.contains("[transform]"));
    }

    #[test]
    fn test_load_from_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrinkray.toml");
        std::fs::write(
            &path,
            "[processing]\nparallel_workers = 8\n\n[transform]\nquality = 65\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.processing.parallel_workers, 8);
        assert_eq!(config.transform.quality, 65);
        assert_eq!(config.transform.target_width, 800);
        assert_eq!(config.store.source_prefix, "uuid/");
    }

    #[test]
    fn test_load_from_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[processing\nparallel_workers = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
