//! Retry policy for backend calls.
//!
//! Errors are classified by backend code through a fixed table rather than
//! by inspecting message text. Codes in the table are constraint or schema
//! failures that would recur identically; anything else, including errors
//! with no code at all, is treated as transient.

use crate::config::RetryConfig;
use crate::storage::BackendError;
use std::time::Duration;

/// Whether a failed call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient; try again after backoff.
    Retryable,
    /// Deterministic; report immediately.
    NonRetryable,
}

/// Known non-retryable backend codes and their operator-facing messages.
const NON_RETRYABLE_CODES: &[(&str, &str)] = &[
    ("23505", "a record with this key already exists"),
    ("23503", "referenced record does not exist"),
    ("23502", "a required value is missing"),
    ("22P02", "a value has the wrong type"),
    ("42703", "unknown column"),
    ("42P01", "unknown table"),
    (VALIDATION_FAILED, "validation failed"),
];

/// Code attached to write-time validation failures raised by the engine.
pub const VALIDATION_FAILED: &str = "VALIDATION";

/// Classifies a backend error.
#[must_use]
pub fn classify(error: &BackendError) -> ErrorClass {
    match error.code() {
        Some(code) if NON_RETRYABLE_CODES.iter().any(|(c, _)| *c == code) => {
            ErrorClass::NonRetryable
        },
        _ => ErrorClass::Retryable,
    }
}

/// Human-readable reason for a failed row.
///
/// Known constraint codes get a fixed message; other errors keep their own.
#[must_use]
pub fn describe(error: &BackendError) -> String {
    error
        .code()
        .filter(|code| *code != VALIDATION_FAILED)
        .and_then(|code| NON_RETRYABLE_CODES.iter().find(|(c, _)| *c == code))
        .map_or_else(|| error.message().to_string(), |(_, msg)| (*msg).to_string())
}

/// Bookkeeping for the latest failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// Attempts made so far, 1-based.
    pub attempt: u32,
    /// Delay before the next attempt, if one will be made.
    pub next_delay: Option<Duration>,
    /// Classification of the error that ended the attempt.
    pub class: ErrorClass,
}

/// Final error of a call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError {
    /// Last error returned by the backend.
    pub error: BackendError,
    /// State after the last attempt.
    pub last_attempt: RetryAttempt,
}

enum FailureAction {
    Retry(Duration),
    Fail,
}

/// Exponential-backoff retry around a synchronous backend call.
///
/// Sleeps block the calling thread, so run it off the async executor.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy from config.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Maximum attempts per call, the first one included.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Runs `call` until it succeeds, fails non-retryably, or attempts run out.
    ///
    /// `entity` labels logs and metrics.
    ///
    /// # Errors
    ///
    /// Returns the last backend error with its attempt bookkeeping.
    pub fn run<T, F>(&self, entity: &'static str, mut call: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Result<T, BackendError>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match call() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let class = classify(&err);
            match self.handle_failure(entity, &err, class, attempt, max_attempts) {
                FailureAction::Retry(delay) => {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                },
                FailureAction::Fail => {
                    return Err(RetryError {
                        error: err,
                        last_attempt: RetryAttempt {
                            attempt,
                            next_delay: None,
                            class,
                        },
                    });
                },
            }
        }
    }

    fn handle_failure(
        &self,
        entity: &'static str,
        err: &BackendError,
        class: ErrorClass,
        attempt: u32,
        max_attempts: u32,
    ) -> FailureAction {
        if class == ErrorClass::NonRetryable {
            tracing::debug!(entity, attempt, error = %err, "non-retryable backend error");
            return FailureAction::Fail;
        }
        if attempt >= max_attempts {
            tracing::warn!(entity, attempt, error = %err, "retries exhausted");
            return FailureAction::Fail;
        }

        let delay = self.config.delay_for_attempt(attempt);
        metrics::counter!("import_retries_total", "entity" => entity).increment(1);
        tracing::warn!(
            entity,
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "retrying backend call"
        );
        FailureAction::Retry(delay)
    }
}
