//! Bounded-retry primitive
//!
//! Every fallible call in the system goes through [`RetryPolicy`]; there is
//! no ad hoc error swallowing anywhere else. The policy retries transient
//! failures a bounded number of times with a fixed delay, optionally running a
//! corrective hook before each re-attempt, and never retries cancellation.

use std::time::Duration;

/// Classification of errors as seen by the retry layer
///
/// Implemented by every error type that passes through a [`RetryPolicy`].
/// Cancellation is checked before retryability: a cancelled error propagates
/// on its first occurrence no matter how many attempts remain.
pub trait RetryClass {
    /// Whether another attempt could plausibly succeed
    fn is_retryable(&self) -> bool;

    /// Whether this error is a cooperative-cancellation signal
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// How loudly failed attempts are traced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTrace {
    /// Log every failed attempt
    Always,
    /// Log only the attempt that exhausted the policy
    LastAttemptOnly,
    /// Log nothing
    Never,
}

/// A bounded retry policy with a fixed inter-attempt delay
///
/// `retries` counts re-attempts, so an operation runs at most `retries + 1`
/// times.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retries: u32,
    delay: Duration,
    trace: RetryTrace,
}

impl RetryPolicy {
    /// Creates a policy with the given number of re-attempts and delay
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries: retries.max(1),
            delay,
            trace: RetryTrace::LastAttemptOnly,
        }
    }

    /// Sets the trace verbosity for failed attempts
    pub fn with_trace(mut self, trace: RetryTrace) -> Self {
        self.trace = trace;
        self
    }

    /// Runs the operation, propagating the last error on exhaustion
    ///
    /// Non-retryable and cancelled errors propagate immediately without
    /// consuming further attempts.
    pub async fn run<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: RetryClass + std::fmt::Display,
        F: AsyncFnMut() -> Result<T, E>,
    {
        self.run_with_recovery(op, async || Ok(())).await
    }

    /// Runs the operation with a corrective hook before each re-attempt
    ///
    /// The hook's own failure is swallowed (logged at debug); a broken
    /// recovery step must not mask the original error.
    pub async fn run_with_recovery<T, E, F, H>(&self, mut op: F, mut on_retry: H) -> Result<T, E>
    where
        E: RetryClass + std::fmt::Display,
        F: AsyncFnMut() -> Result<T, E>,
        H: AsyncFnMut() -> Result<(), E>,
    {
        let attempts = self.retries + 1;

        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt >= attempts {
                        if self.trace != RetryTrace::Never {
                            tracing::warn!(
                                "Attempt {}/{} failed, giving up: {}",
                                attempt,
                                attempts,
                                e
                            );
                        }
                        return Err(e);
                    }

                    if self.trace == RetryTrace::Always {
                        tracing::warn!(
                            "Attempt {}/{} failed, retrying in {:?}: {}",
                            attempt,
                            attempts,
                            self.delay,
                            e
                        );
                    }

                    if let Err(hook_err) = on_retry().await {
                        tracing::debug!("Retry recovery hook failed: {}", hook_err);
                    }

                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Runs the operation, swallowing exhaustion
    ///
    /// Returns `None` instead of an error when the policy is exhausted or the
    /// error is non-retryable, logging per the trace verbosity. Cancellation
    /// is still propagated to the caller as `Err`.
    pub async fn run_swallow<T, E, F>(&self, op: F) -> Result<Option<T>, E>
    where
        E: RetryClass + std::fmt::Display,
        F: AsyncFnMut() -> Result<T, E>,
    {
        match self.run(op).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                if self.trace != RetryTrace::Never {
                    tracing::warn!("Operation failed after retries, continuing: {}", e);
                }
                Ok(None)
            }
        }
    }
}
