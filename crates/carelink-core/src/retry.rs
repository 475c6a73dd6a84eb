//! Bounded store I/O: per-attempt timeout plus exponential backoff.
//!
//! Retries only on transient failures ([`StoreError::is_transient`]).
//! Version conflicts, missing records and decode failures are returned
//! immediately; the caller decides whether re-reading makes sense.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;

/// Maximum number of retry attempts after the initial call.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;

/// Deadline for a single store call.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// No backoff and a short deadline. For tests that inject failures.
    pub fn immediate() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(0),
            timeout: Duration::from_millis(500),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Run a store call under `policy`.
///
/// `f` is invoked up to `max_retries + 1` times. Each invocation is bounded
/// by `policy.timeout`; an elapsed deadline counts as a transient failure.
/// When the budget is spent the last error is wrapped in
/// [`StoreError::Unavailable`].
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut f: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                millis: u64::try_from(policy.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    max_retries = policy.max_retries,
                    "store call failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_transient() => {
                tracing::error!(
                    operation,
                    attempts = attempt + 1,
                    "store call failed permanently: {e}"
                );
                return Err(StoreError::Unavailable(format!(
                    "{operation} failed after {} attempts: {e}",
                    attempt + 1
                )));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Cooperative cancellation for long-running bulk operations.
///
/// Cloning shares the flag. Bulk loops check it between units of work, so a
/// unit already in flight always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
