//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.source_bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.source_bucket must be set".into(),
            ));
        }
        if self.store.destination_bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.destination_bucket must be set".into(),
            ));
        }
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.transform.target_width == 0 {
            return Err(ConfigError::ValidationError(
                "transform.target_width must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&self.transform.quality) {
            return Err(ConfigError::ValidationError(
                "transform.quality must be between 1 and 100".into(),
            ));
        }
        if self.transform.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "transform.max_image_dimension must be > 0".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.store.source_bucket = "photos-raw".into();
        config.store.destination_bucket = "photos-web".into();
        config
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_default_config_requires_buckets() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("source_bucket"));

        let mut config = valid_config();
        config.store.destination_bucket = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("destination_bucket"));
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = valid_config();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_zero_target_width() {
        let mut config = valid_config();
        config.transform.target_width = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target_width"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = valid_config();
        config.transform.quality = 0;
        assert!(config.validate().is_err());

        config.transform.quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = valid_config();
        config.logging.format = "xml".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
