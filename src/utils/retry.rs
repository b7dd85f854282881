//! Retry utilities for probe attempts
//!
//! This module provides the retry mechanism with exponential backoff used by
//! the liveness prober. Retries stop early when the supplied cancellation
//! token fires, either before an attempt or during a backoff sleep.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Delay to wait before the given attempt (attempt 0 never waits)
    ///
    /// The sequence is non-decreasing and capped at `max_delay_ms`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponential =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
            (exponential as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }

    /// Total number of attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Result of a retried operation
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded
    Succeeded { value: T, attempts: u32 },

    /// Attempts were exhausted, or the last error was not retryable
    Failed { error: E, attempts: u32 },

    /// The cancellation token fired before the operation settled
    Cancelled { attempts: u32, last_error: Option<E> },
}

impl<T, E> RetryOutcome<T, E> {
    /// Number of attempts actually issued
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Execute an operation with retry logic, using a custom retry predicate
///
/// The operation receives the zero-based attempt number. Errors for which
/// `should_retry` returns `false` end the loop immediately.
///
/// # Example
///
/// ```no_run
/// use playcheck::utils::retry::{with_retry_if, RetryConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() {
/// let config = RetryConfig::new(2);
/// let cancel = CancellationToken::new();
/// let outcome = with_retry_if(
///     &config,
///     &cancel,
///     |_attempt| async { Ok::<_, String>(42) },
///     |e: &String| !e.contains("invalid"),
/// )
/// .await;
/// assert!(outcome.is_success());
/// # }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut last_error = None;
    let mut attempts = 0;

    for attempt in 0..config.max_attempts() {
        if cancel.is_cancelled() {
            return RetryOutcome::Cancelled {
                attempts,
                last_error,
            };
        }

        if attempt > 0 {
            let delay = config.calculate_delay(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying operation after delay"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    return RetryOutcome::Cancelled { attempts, last_error };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        attempts += 1;
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return RetryOutcome::Succeeded { value, attempts };
            }
            Err(e) => {
                if !should_retry(&e) {
                    debug!(error = %e, "Non-retryable error encountered");
                    return RetryOutcome::Failed { error: e, attempts };
                }

                debug!(
                    attempt = attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed"
                );
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(error) => RetryOutcome::Failed { error, attempts },
        None => {
            warn!("Retry loop finished without recording an error");
            RetryOutcome::Cancelled {
                attempts,
                last_error: None,
            }
        }
    }
}
