//! Tracing subscriber setup for the shrinkray binary.
//!
//! All log output goes to stderr. Stdout carries nothing but the final
//! JSON run result, so it can be piped straight into other tools.

use shrinkray_core::config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output flavour selected by `logging.format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored single-line events for a terminal
    Pretty,
    /// One JSON object per event, for log collectors
    Json,
}

impl LogFormat {
    fn from_config(config: &LoggingConfig) -> Self {
        if config.format == "json" {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces `level` entirely.
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init(),
    }
}

pub fn init_from_config(config: &shrinkray_core::Config) {
    init(&config.logging.level, LogFormat::from_config(&config.logging));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(format: &str) -> LoggingConfig {
        LoggingConfig {
            format: format.to_string(),
            ..LoggingConfig::default()
        }
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(LogFormat::from_config(&logging("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_config(&logging("pretty")), LogFormat::Pretty);
    }
}
