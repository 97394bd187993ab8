//! Structured logging configuration.

use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_FILTER_ENV: &str = "STOREPORT_LOG";
/// Environment variable selecting `pretty` or `json` output.
pub const LOG_FORMAT_ENV: &str = "STOREPORT_LOG_FORMAT";
/// Environment variable naming a log file to append to.
pub const LOG_FILE_ENV: &str = "STOREPORT_LOG_FILE";

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Append events to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the configuration from the environment.
    ///
    /// `STOREPORT_LOG` wins over `RUST_LOG`; without either the level is
    /// `info`, or `debug` when `verbose` is set.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_lookup(verbose, |key| std::env::var(key).ok())
    }

    fn from_lookup(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_level = if verbose { "storeport=debug" } else { "storeport=info" };
        let directive = lookup(LOG_FILTER_ENV)
            .or_else(|| lookup(EnvFilter::DEFAULT_ENV))
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| default_level.to_string());
        let filter =
            EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(default_level));

        let format = lookup(LOG_FORMAT_ENV)
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();
        let file = lookup(LOG_FILE_ENV)
            .filter(|f| !f.trim().is_empty())
            .map(PathBuf::from);

        Self {
            filter,
            format,
            file,
        }
    }

    /// Overrides the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the log file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(false, lookup(&[]));
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file.is_none());
        assert_eq!(config.filter.to_string(), "storeport=info");
    }

    #[test]
    fn test_verbose_raises_level() {
        let config = LoggingConfig::from_lookup(true, lookup(&[]));
        assert_eq!(config.filter.to_string(), "storeport=debug");
    }

    #[test]
    fn test_env_values() {
        let config = LoggingConfig::from_lookup(
            false,
            lookup(&[
                ("RUST_LOG", "warn"),
                (LOG_FILTER_ENV, "storeport=trace"),
                (LOG_FORMAT_ENV, "JSON"),
                (LOG_FILE_ENV, "/tmp/storeport.log"),
            ]),
        );
        assert_eq!(config.filter.to_string(), "storeport=trace");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/storeport.log")));
    }

    #[test]
    fn test_unknown_format_falls_back() {
        let config = LoggingConfig::from_lookup(false, lookup(&[(LOG_FORMAT_ENV, "xml")]));
        assert_eq!(config.format, LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
