//! Liveness probing with retry and backoff
//!
//! A [`LivenessProber`] turns one candidate location into a
//! [`ProbeOutcome`]. Every attempt takes a slot from the shared
//! [`ProbeSlots`] pool for the duration of the network call only; backoff
//! sleeps hold no slot.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::link::LinkCheck;
use crate::metrics;
use crate::models::ProbeOutcome;
use crate::utils::display_host;
use crate::utils::error::ProbeError;
use crate::utils::retry::{with_retry_if, RetryConfig, RetryOutcome};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Global ceiling on in-flight probe attempts
///
/// Cloning shares the same pool.
#[derive(Debug, Clone)]
pub struct ProbeSlots {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ProbeSlots {
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot unless `cancel` fires first
    async fn acquire(&self, cancel: &CancellationToken) -> Result<SemaphorePermit<'_>, ProbeError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            permit = self.semaphore.acquire() => permit.map_err(|_| ProbeError::Cancelled),
        }
    }
}

/// Stateless per-call liveness checker
pub struct LivenessProber {
    checker: Arc<dyn LinkCheck>,
    slots: ProbeSlots,
    retry: RetryConfig,
    retry_client_errors: bool,
    rate_limiter: Option<DirectRateLimiter>,
}

impl LivenessProber {
    /// Create a prober drawing slots from `slots`
    pub fn new(checker: Arc<dyn LinkCheck>, slots: ProbeSlots, retry: RetryConfig) -> Self {
        Self {
            checker,
            slots,
            retry,
            retry_client_errors: true,
            rate_limiter: None,
        }
    }

    /// Whether 4xx answers other than 408/429 are retried
    pub fn with_retry_client_errors(mut self, retry_client_errors: bool) -> Self {
        self.retry_client_errors = retry_client_errors;
        self
    }

    /// Cap attempts per second across all callers
    pub fn with_rate_limit(mut self, per_second: Option<u32>) -> Self {
        self.rate_limiter = per_second
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));
        self
    }

    pub fn slots(&self) -> &ProbeSlots {
        &self.slots
    }

    /// Probe `location` with up to `max_retries` retries
    ///
    /// `cancel` is checked before every attempt and while waiting for a slot
    /// or a backoff delay. A cancelled probe reports itself unreachable; its
    /// caller is expected to ignore the outcome.
    pub async fn probe(
        &self,
        location: &str,
        timeout: Duration,
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> ProbeOutcome {
        let started = Instant::now();
        let config = RetryConfig {
            max_retries,
            ..self.retry.clone()
        };

        let outcome = with_retry_if(
            &config,
            cancel,
            |attempt| self.attempt(location, timeout, attempt, cancel),
            |e: &ProbeError| e.is_retryable(self.retry_client_errors),
        )
        .await;

        let attempt_count = outcome.attempts();
        let elapsed = started.elapsed();

        match outcome {
            RetryOutcome::Succeeded { value, .. } => {
                tracing::debug!(
                    host = %display_host(location),
                    attempts = attempt_count,
                    status = ?value,
                    "Location reachable"
                );
                ProbeOutcome {
                    location: location.to_string(),
                    is_reachable: true,
                    attempt_count,
                    elapsed,
                    status: value,
                    error: None,
                }
            }
            RetryOutcome::Failed { error, .. } => {
                tracing::debug!(
                    host = %display_host(location),
                    attempts = attempt_count,
                    error = %error,
                    "Location unreachable"
                );
                ProbeOutcome {
                    location: location.to_string(),
                    is_reachable: false,
                    attempt_count,
                    elapsed,
                    status: match error {
                        ProbeError::Status(code) => Some(code),
                        _ => None,
                    },
                    error: Some(error.to_string()),
                }
            }
            RetryOutcome::Cancelled { last_error, .. } => ProbeOutcome {
                location: location.to_string(),
                is_reachable: false,
                attempt_count,
                elapsed,
                status: None,
                error: Some(
                    last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| ProbeError::Cancelled.to_string()),
                ),
            },
        }
    }

    async fn attempt(
        &self,
        location: &str,
        timeout: Duration,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<Option<u16>, ProbeError> {
        if let Some(limiter) = &self.rate_limiter {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                _ = limiter.until_ready() => {}
            }
        }

        let _permit = self.slots.acquire(cancel).await?;

        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, self.checker.check(location, timeout)).await
        {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout),
        };
        let elapsed = started.elapsed();

        let label = match &result {
            Ok(_) => "reachable",
            Err(e) => e.kind(),
        };
        metrics::record_probe_attempt(label, elapsed);

        tracing::debug!(
            host = %display_host(location),
            attempt = attempt,
            result = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "Probe attempt finished"
        );

        result
    }
}
