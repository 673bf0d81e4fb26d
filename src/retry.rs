//! Bounded retry with exponential backoff for transient faults.
//!
//! Network calls to the content store and the ledger are the protocol's
//! only suspension points. Each one is wrapped here: transient transport
//! faults retry a few times with doubling delay, while confirmed
//! rejections (insufficient funds, malformed payloads, missing
//! transactions) surface immediately. [`AnchorError::is_transient`] is the
//! classifier.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Single attempt; every fault surfaces immediately.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }
}

/// Run `op`, retrying transient failures per `policy`. `what` names the
/// operation in log output.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, what: &str, op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    operation = what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnchorError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&quick_policy(3), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(AnchorError::StoreUnavailable("blip".into()))
            } else {
                Ok(42u32)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_backoff(&quick_policy(3), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AnchorError::StoreUnavailable("still down".into()))
        })
        .await;
        assert!(matches!(result, Err(AnchorError::StoreUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_rejection_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_backoff(&quick_policy(5), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AnchorError::InsufficientFunds("balance too low".into()))
        })
        .await;
        assert!(matches!(result, Err(AnchorError::InsufficientFunds(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_backoff(&RetryPolicy::none(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AnchorError::StoreUnavailable("down".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
