//! Tracing subscriber initialization.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `RUST_LOG` | `info` | `EnvFilter` directives |
//! | `PRINTWORKS_LOG_FORMAT` | `json` | `json` or `pretty` |

use core::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogConfigError {
    #[error("unknown log format '{0}' (expected json or pretty)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-line output for local runs.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = LogConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(LogConfigError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Result<Self, LogConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LogConfigError> {
        let filter = lookup("RUST_LOG")
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        let format = match lookup("PRINTWORKS_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self { filter, format })
    }
}

/// Initialize tracing/logging for the process from the environment.
///
/// An unreadable `PRINTWORKS_LOG_FORMAT` falls back to JSON.
pub fn init() {
    init_with(&LogConfig::from_env().unwrap_or_default());
}

/// Initialize tracing/logging with an explicit config.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.pretty().try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info_json() {
        let config = LogConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn reads_filter_and_format() {
        let config = LogConfig::from_lookup(|key| match key {
            "RUST_LOG" => Some("printworks_infra=debug".to_string()),
            "PRINTWORKS_LOG_FORMAT" => Some("Pretty".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.filter, "printworks_infra=debug");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert_eq!(err, LogConfigError::UnknownFormat("xml".to_string()));
    }

    #[test]
    fn second_init_is_a_no_op() {
        let config = LogConfig::default();
        let _ = init_with(&config);
        assert!(!init_with(&config));
    }
}
