//! Configuration management.
//!
//! All engine tunables live in [`EngineConfig`], passed into the services at
//! construction. Values come from, in increasing precedence: built-in
//! defaults, a TOML file, and `STOREPORT_*` environment variables.
//!
//! ```toml
//! max_input_bytes = 10485760
//! max_rows = 1000
//! batch_size = 20
//! inter_batch_pause_ms = 100
//! unknown_category_policy = "accept-as-text"
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default input ceiling: 10 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;
/// Default row ceiling per import call.
pub const DEFAULT_MAX_ROWS: usize = 1000;
/// Default batch size, which is also the per-batch concurrency limit.
pub const DEFAULT_BATCH_SIZE: usize = 20;
/// Default pause between batches.
pub const DEFAULT_INTER_BATCH_PAUSE_MS: u64 = 100;

/// What to do with a category name that matches nothing in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownCategoryPolicy {
    /// Keep the row and store the name as free text.
    #[default]
    AcceptAsText,
    /// Invalidate the row.
    Reject,
}

impl UnknownCategoryPolicy {
    /// Returns the policy name as used in config files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptAsText => "accept-as-text",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for UnknownCategoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnknownCategoryPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "accept-as-text" | "accept" => Ok(Self::AcceptAsText),
            "reject" => Ok(Self::Reject),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown category policy: {other}"
            ))),
        }
    }
}

/// Retry policy settings for row writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per row, the first one included (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds for exponential backoff (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// Formula: `base_delay_ms` * 2^(attempt - 1)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(
            self.base_delay_ms
                .saturating_mul(1 << (attempt - 1).min(10)),
        )
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Largest accepted input, in bytes.
    pub max_input_bytes: usize,
    /// Most rows accepted in one import call.
    pub max_rows: usize,
    /// Rows per batch; also the number of rows in flight at once.
    pub batch_size: usize,
    /// Retry policy for backend writes.
    pub retry: RetryConfig,
    /// Pause between consecutive batches.
    pub inter_batch_pause_ms: u64,
    /// Handling of category names unknown to the backend.
    pub unknown_category_policy: UnknownCategoryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_rows: DEFAULT_MAX_ROWS,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryConfig::default(),
            inter_batch_pause_ms: DEFAULT_INTER_BATCH_PAUSE_MS,
            unknown_category_policy: UnknownCategoryPolicy::default(),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Input ceiling in bytes.
    pub max_input_bytes: Option<usize>,
    /// Row ceiling.
    pub max_rows: Option<usize>,
    /// Batch size.
    pub batch_size: Option<usize>,
    /// Inter-batch pause.
    pub inter_batch_pause_ms: Option<u64>,
    /// Category policy name.
    pub unknown_category_policy: Option<String>,
    /// Retry settings.
    pub retry: Option<RetryConfig>,
}

impl EngineConfig {
    /// Creates a configuration with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from defaults plus environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `STOREPORT_*` environment variables on top of this config.
    ///
    /// Unset or unparsable variables leave the current value in place.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = parsed(&lookup, "STOREPORT_MAX_INPUT_BYTES") {
            self.max_input_bytes = v;
        }
        if let Some(v) = parsed(&lookup, "STOREPORT_MAX_ROWS") {
            self.max_rows = v;
        }
        if let Some(v) = parsed(&lookup, "STOREPORT_BATCH_SIZE") {
            self.batch_size = v;
        }
        if let Some(v) = parsed(&lookup, "STOREPORT_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = v;
        }
        if let Some(v) = parsed(&lookup, "STOREPORT_RETRY_BASE_DELAY_MS") {
            self.retry.base_delay_ms = v;
        }
        if let Some(v) = parsed(&lookup, "STOREPORT_INTER_BATCH_PAUSE_MS") {
            self.inter_batch_pause_ms = v;
        }
        if let Some(v) = parsed(&lookup, "STOREPORT_UNKNOWN_CATEGORY_POLICY") {
            self.unknown_category_policy = v;
        }
        self.clamped()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Looks for `storeport/config.toml` in the platform config dir. Returns
    /// the default configuration if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let path = base_dirs.config_dir().join("storeport").join("config.toml");
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                Self::default()
            },
        }
    }

    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(v) = file.max_input_bytes {
            config.max_input_bytes = v;
        }
        if let Some(v) = file.max_rows {
            config.max_rows = v;
        }
        if let Some(v) = file.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = file.inter_batch_pause_ms {
            config.inter_batch_pause_ms = v;
        }
        if let Some(policy) = file.unknown_category_policy {
            config.unknown_category_policy = policy.parse()?;
        }
        if let Some(retry) = file.retry {
            config.retry = retry;
        }

        Ok(config.clamped())
    }

    /// Raises zero values to the smallest usable setting.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.retry.max_attempts = self.retry.max_attempts.max(1);
        self
    }

    /// Sets the input ceiling in bytes.
    #[must_use]
    pub const fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    /// Sets the row ceiling.
    #[must_use]
    pub const fn with_max_rows(mut self, rows: usize) -> Self {
        self.max_rows = rows;
        self
    }

    /// Sets the batch size (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self.clamped()
    }

    /// Sets the inter-batch pause.
    #[must_use]
    pub const fn with_inter_batch_pause_ms(mut self, ms: u64) -> Self {
        self.inter_batch_pause_ms = ms;
        self
    }

    /// Sets the unknown-category policy.
    #[must_use]
    pub const fn with_unknown_category_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_category_policy = policy;
        self
    }

    /// Configuration with every delay set to zero, for tests and tooling.
    #[must_use]
    pub fn without_delays(self) -> Self {
        let retry = RetryConfig {
            base_delay_ms: 0,
            ..self.retry
        };
        self.with_retry(retry).with_inter_batch_pause_ms(0)
    }

    /// Pause between batches as a [`Duration`].
    #[must_use]
    pub const fn inter_batch_pause(&self) -> Duration {
        Duration::from_millis(self.inter_batch_pause_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_input_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_rows, 1000);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.inter_batch_pause_ms, 100);
        assert_eq!(
            config.unknown_category_policy,
            UnknownCategoryPolicy::AcceptAsText
        );
    }

    #[test]
    fn test_delay_doubles() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOREPORT_BATCH_SIZE", "5"),
            ("STOREPORT_RETRY_MAX_ATTEMPTS", "0"),
            ("STOREPORT_MAX_ROWS", "not-a-number"),
            ("STOREPORT_UNKNOWN_CATEGORY_POLICY", "reject"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::default()
            .with_overrides_from(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.batch_size, 5);
        assert_eq!(config.retry.max_attempts, 1, "zero attempts is clamped");
        assert_eq!(config.max_rows, 1000, "unparsable value is ignored");
        assert_eq!(config.unknown_category_policy, UnknownCategoryPolicy::Reject);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "batch_size = 0\nunknown_category_policy = \"reject\"\n[retry]\nbase_delay_ms = 10"
        )
        .unwrap();

        let config = EngineConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.retry.base_delay_ms, 10);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.unknown_category_policy, UnknownCategoryPolicy::Reject);
    }

    #[test]
    fn test_load_from_file_rejects_bad_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "unknown_category_policy = \"maybe\"").unwrap();
        assert!(EngineConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = EngineConfig::load_from_file(Path::new("/nonexistent/storeport.toml"));
        assert!(matches!(err, Err(crate::Error::OperationFailed { .. })));
    }

    #[test]
    fn test_without_delays() {
        let config = EngineConfig::default().without_delays();
        assert_eq!(config.retry.base_delay_ms, 0);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.inter_batch_pause(), Duration::ZERO);
    }
}
