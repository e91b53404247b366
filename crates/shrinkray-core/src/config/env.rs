//! Environment-variable loading.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

use super::Config;

/// Required: bucket to read source images from.
pub const SOURCE_LOCATION_VAR: &str = "SOURCE_LOCATION";
/// Required: bucket to write optimized images to.
pub const DESTINATION_LOCATION_VAR: &str = "DESTINATION_LOCATION";
/// Older name for [`SOURCE_LOCATION_VAR`], still honoured.
pub const SOURCE_BUCKET_VAR: &str = "SOURCE_BUCKET";
/// Older name for [`DESTINATION_LOCATION_VAR`], still honoured.
pub const DESTINATION_BUCKET_VAR: &str = "DESTINATION_BUCKET";
/// Optional path to a TOML file used as the base configuration.
pub const CONFIG_FILE_VAR: &str = "SHRINKRAY_CONFIG";

impl Config {
    /// Build configuration from an arbitrary variable lookup.
    ///
    /// `from_env` passes `std::env::var`; tests pass a map so they never
    /// depend on the real process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = match get(CONFIG_FILE_VAR) {
            Some(path) => {
                let path = PathBuf::from(shellexpand::tilde(&path).into_owned());
                tracing::debug!("Loading base config from {:?}", path);
                Config::load_from(&path)?
            }
            None => Config::default(),
        };

        match get(SOURCE_LOCATION_VAR).or_else(|| get(SOURCE_BUCKET_VAR)) {
            Some(bucket) => config.store.source_bucket = bucket,
            None if config.store.source_bucket.is_empty() => {
                return Err(ConfigError::Missing(SOURCE_LOCATION_VAR.to_string()));
            }
            None => {}
        }
        match get(DESTINATION_LOCATION_VAR).or_else(|| get(DESTINATION_BUCKET_VAR)) {
            Some(bucket) => config.store.destination_bucket = bucket,
            None if config.store.destination_bucket.is_empty() => {
                return Err(ConfigError::Missing(DESTINATION_LOCATION_VAR.to_string()));
            }
            None => {}
        }

        if let Some(prefix) = get("SHRINKRAY_SOURCE_PREFIX") {
            config.store.source_prefix = prefix;
        }
        if let Some(prefix) = get("SHRINKRAY_DESTINATION_PREFIX") {
            config.store.destination_prefix = prefix;
        }
        if let Some(endpoint) = get("S3_ENDPOINT_URL") {
            config.store.endpoint_url = Some(endpoint);
            // Emulators and MinIO rarely resolve virtual-hosted bucket names.
            config.store.force_path_style = true;
        }
        if let Some(region) = get("AWS_REGION") {
            config.store.region = Some(region);
        }

        if let Some(workers) = parse_var(&get, "SHRINKRAY_WORKERS")? {
            config.processing.parallel_workers = workers;
        }
        if let Some(width) = parse_var(&get, "SHRINKRAY_TARGET_WIDTH")? {
            config.transform.target_width = width;
        }
        if let Some(quality) = parse_var(&get, "SHRINKRAY_QUALITY")? {
            config.transform.quality = quality;
        }

        if let Some(level) = get("SHRINKRAY_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = get("SHRINKRAY_LOG_FORMAT") {
            config.logging.format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, G>(get: &G, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            var: name.to_string(),
            value: raw,
        })
}
