// Logging module for structured logging using the tracing crate

use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Log line encoding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log aggregation systems
    #[default]
    Json,
    /// Human readable
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// klog-style verbosity: 0-1 info, 2-3 debug, 4 and above trace
    #[serde(default)]
    pub verbosity: u8,
}

/// Filter directive for a klog-style verbosity level
pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 | 1 => "info",
        2 | 3 => "debug",
        _ => "trace",
    }
}

/// Initialize the tracing subscriber for structured logging
///
/// `RUST_LOG` takes precedence when set; otherwise the level comes from
/// `config.verbosity`. Output goes to stdout.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(config.verbosity)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.try_init(),
    }
}
