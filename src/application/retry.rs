use crate::error::{LedgerError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How often a unit of work is re-run when its commit loses a race.
///
/// Only `LedgerError::Conflict` is retried. Every other error, including
/// business-rule rejections, is returned as-is on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Runs `unit` until it succeeds, fails for a non-transient reason, or
    /// runs out of attempts. The delay doubles after every conflict.
    ///
    /// `unit` must re-read whatever it depends on each time it is called.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut unit: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut delay = self.base_delay;
        for attempt in 1..=attempts {
            match unit().await {
                Err(e) if e.is_conflict() => {
                    if attempt == attempts {
                        break;
                    }
                    debug!(operation, attempt, ?delay, "Commit conflicted, retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                other => return other,
            }
        }
        Err(LedgerError::StaleRequest(format!(
            "{} gave up after {} conflicting attempts",
            operation, attempts
        )))
    }
}
