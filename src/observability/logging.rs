//! Structured logging configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "WARDEN_LOG";
/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "WARDEN_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Resolves settings, letting `WARDEN_LOG` / `RUST_LOG` and
    /// `WARDEN_LOG_FORMAT` override the configured values.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        let directive = std::env::var(LOG_FILTER_ENV)
            .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
            .unwrap_or_else(|_| settings.filter.clone());
        let format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| LogFormat::parse(&value))
            .unwrap_or(settings.format);
        Self {
            format,
            filter: parse_filter(&directive),
            file: settings.file.clone(),
        }
    }

    /// Raises the filter to `debug` (the `--verbose` flag).
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.filter = parse_filter("debug");
        self
    }
}

/// Parses a filter directive, falling back to `info` when it is invalid.
fn parse_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}
