//! Generation Orchestrator: wraps one provider call with a per-attempt timeout
//! and a bounded, strictly sequential retry loop.
//!
//! Only timeouts and transient provider errors are retried. Structural problems
//! with a successful response are left to later pipeline stages.
//!
//! Cancellation is observed at every suspension point: before each attempt,
//! while an attempt is in flight and during each backoff wait. The per-attempt
//! timer is owned by the `select!` that races it, so it is dropped on every exit
//! path.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::llm_client::{ProviderError, TextProvider};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

// ────────────────────────────────────────────────────────────────────────────
// Cancellation
// ────────────────────────────────────────────────────────────────────────────

/// Observed by the orchestrator. Cloneable; all clones see the same signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Fires its signal on `cancel()` or when dropped, so abandoning the handle
/// abandons the work.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the sender went away without
    /// cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Policy and results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each retry after that.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base, 2×base, 4×base, …
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation timed out on all {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("generation failed after {attempts} attempt(s): {last}")]
    Provider {
        attempts: u32,
        #[source]
        last: ProviderError,
    },

    #[error("generation cancelled")]
    Cancelled,
}

/// One provider call. Kept for logging and tests, never persisted.
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub attempt_number: u32,
    pub started_at: Instant,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct GenerationRun {
    pub result: Result<String, GenerationError>,
    pub attempts: Vec<GenerationAttempt>,
}

enum AttemptFailure {
    Timeout,
    Provider(ProviderError),
}

impl AttemptFailure {
    fn describe(&self, timeout: Duration) -> String {
        match self {
            AttemptFailure::Timeout => format!("timed out after {}ms", timeout.as_millis()),
            AttemptFailure::Provider(e) => e.to_string(),
        }
    }

    fn into_terminal(self, attempts: u32) -> GenerationError {
        match self {
            AttemptFailure::Timeout => GenerationError::Timeout { attempts },
            AttemptFailure::Provider(last) => GenerationError::Provider { attempts, last },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GenerationOrchestrator {
    provider: Arc<dyn TextProvider>,
    policy: RetryPolicy,
}

impl GenerationOrchestrator {
    pub fn new(provider: Arc<dyn TextProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub async fn generate(&self, prompt: &str, cancel: &CancelSignal) -> Result<String, GenerationError> {
        self.run(prompt, cancel).await.result
    }

    /// Like `generate`, also returning the record of every attempt made.
    pub async fn run(&self, prompt: &str, cancel: &CancelSignal) -> GenerationRun {
        let mut attempts: Vec<GenerationAttempt> = Vec::new();
        let mut attempt_number = 0u32;

        loop {
            attempt_number += 1;

            if cancel.is_cancelled() {
                info!(attempt = attempt_number, "Generation cancelled before attempt");
                return GenerationRun {
                    result: Err(GenerationError::Cancelled),
                    attempts,
                };
            }

            let started_at = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = tokio::time::timeout(self.policy.timeout, self.provider.complete(prompt)) => Some(result),
            };

            let failure = match outcome {
                None => {
                    info!(attempt = attempt_number, "Generation cancelled during attempt");
                    attempts.push(GenerationAttempt {
                        attempt_number,
                        started_at,
                        error: Some("cancelled".to_string()),
                    });
                    return GenerationRun {
                        result: Err(GenerationError::Cancelled),
                        attempts,
                    };
                }
                Some(Ok(Ok(text))) => {
                    debug!(
                        attempt = attempt_number,
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        "Generation attempt succeeded"
                    );
                    attempts.push(GenerationAttempt {
                        attempt_number,
                        started_at,
                        error: None,
                    });
                    return GenerationRun {
                        result: Ok(text),
                        attempts,
                    };
                }
                Some(Ok(Err(e))) => AttemptFailure::Provider(e),
                Some(Err(_elapsed)) => AttemptFailure::Timeout,
            };

            let description = failure.describe(self.policy.timeout);
            warn!(
                attempt = attempt_number,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %description,
                "Generation attempt failed"
            );
            attempts.push(GenerationAttempt {
                attempt_number,
                started_at,
                error: Some(description),
            });

            let retryable = match &failure {
                AttemptFailure::Timeout => true,
                AttemptFailure::Provider(e) => e.is_transient(),
            };
            if !retryable || attempt_number > self.policy.max_retries {
                return GenerationRun {
                    result: Err(failure.into_terminal(attempt_number)),
                    attempts,
                };
            }

            let delay = self.policy.backoff(attempt_number);
            debug!(
                next_attempt = attempt_number + 1,
                delay_ms = delay.as_millis() as u64,
                "Backing off before retry"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(attempt = attempt_number, "Generation cancelled during backoff");
                    return GenerationRun {
                        result: Err(GenerationError::Cancelled),
                        attempts,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
