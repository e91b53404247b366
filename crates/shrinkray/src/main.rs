//! Shrinkray: batch-optimize images between two S3 buckets.
//!
//! Configuration comes from the environment:
//!
//! ```text
//! SOURCE_LOCATION=raw-uploads DESTINATION_LOCATION=web-assets shrinkray
//! ```
//!
//! Progress and logs go to stderr; the JSON run result goes to stdout.

mod logging;
mod run;

use anyhow::Context;
use shrinkray_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    logging::init_from_config(&config);
    tracing::debug!("shrinkray {}", shrinkray_core::VERSION);

    run::execute(config).await
}
