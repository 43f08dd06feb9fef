//! Retry policy for page accessor calls
//!
//! Transient accessor errors (timeouts, detached elements, navigation
//! failures) are retried with exponential backoff; permanent errors and
//! exhausted budgets escalate to the caller as [`RetryExhausted`].

use crate::accessor::{AccessorError, AccessorResult, PageAccessor};
use futures::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Backoff parameters for retrying accessor calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub base_delay: Duration,

    /// Multiplier applied to the delay after each further failure
    pub growth_factor: f64,

    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            growth_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy with no delays, for tests and replayed fixtures
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            growth_factor: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// `base_delay * growth_factor^(attempt - 1)`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.growth_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Starts tracking attempts of one operation
    pub fn attempts(&self, operation: &str) -> Attempts<'_> {
        Attempts {
            policy: self,
            operation: operation.to_string(),
            failed: 0,
        }
    }
}

/// A failed operation whose retry budget is spent (or whose error is permanent)
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempt(s): {source}")]
pub struct RetryExhausted {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: AccessorError,
}

/// Attempt counter for one operation under a [`RetryPolicy`]
pub struct Attempts<'p> {
    policy: &'p RetryPolicy,
    operation: String,
    failed: u32,
}

impl Attempts<'_> {
    /// Records a failure and waits out the backoff delay
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The error is transient and the budget allows another attempt
    /// * `Err(RetryExhausted)` - The error is permanent or the budget is spent
    pub async fn backoff(&mut self, error: AccessorError) -> Result<(), RetryExhausted> {
        self.failed += 1;

        if !error.is_transient() || self.failed >= self.policy.max_attempts {
            return Err(RetryExhausted {
                operation: self.operation.clone(),
                attempts: self.failed,
                source: error,
            });
        }

        let delay = self.policy.delay_for(self.failed);
        warn!(
            operation = %self.operation,
            attempt = self.failed,
            backoff_ms = delay.as_millis() as u64,
            error = %error,
            "Page accessor call failed, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// Number of failed attempts so far
    pub fn failed(&self) -> u32 {
        self.failed
    }
}

/// Runs one accessor call under a retry policy
///
/// # Arguments
///
/// * `accessor` - Session the call runs against
/// * `policy` - Backoff parameters
/// * `operation` - Name used in logs and in the escalated error
/// * `call` - The call; invoked again for every retry
///
/// # Returns
///
/// * `Ok(T)` - The first successful result
/// * `Err(RetryExhausted)` - The last error once retries are exhausted
pub async fn retry_accessor_call<A, T, F>(
    accessor: &mut A,
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, RetryExhausted>
where
    A: PageAccessor + ?Sized,
    F: for<'a> FnMut(&'a mut A) -> BoxFuture<'a, AccessorResult<T>>,
{
    let mut attempts = policy.attempts(operation);
    loop {
        match call(&mut *accessor).await {
            Ok(value) => return Ok(value),
            Err(error) => attempts.backoff(error).await?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{ElementHandle, FieldRole, SelectorRole, WaitCondition};
    use async_trait::async_trait;

    /// Accessor whose `scroll` fails with queued errors before succeeding
    struct FlakyAccessor {
        failures: Vec<AccessorError>,
        scrolls: u32,
    }

    #[async_trait]
    impl PageAccessor for FlakyAccessor {
        async fn navigate(&mut self, _url: &str) -> AccessorResult<()> {
            Ok(())
        }

        async fn find_items(&mut self, _role: SelectorRole) -> AccessorResult<Vec<ElementHandle>> {
            Ok(Vec::new())
        }

        async fn read_field(
            &mut self,
            _element: ElementHandle,
            _role: FieldRole,
        ) -> AccessorResult<Option<String>> {
            Ok(None)
        }

        async fn scroll(&mut self) -> AccessorResult<()> {
            self.scrolls += 1;
            match self.failures.pop() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        async fn wait_until(
            &mut self,
            _condition: WaitCondition,
            _timeout: Duration,
        ) -> AccessorResult<bool> {
            Ok(true)
        }
    }

    fn timeout() -> AccessorError {
        AccessorError::Timeout("scrolling".to_string())
    }

    #[test]
    fn test_delay_for_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            growth_factor: 2.0,
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let mut accessor = FlakyAccessor {
            failures: vec![timeout(), timeout()],
            scrolls: 0,
        };
        let policy = RetryPolicy::immediate(3);

        retry_accessor_call(&mut accessor, &policy, "scroll", |a| a.scroll())
            .await
            .unwrap();
        assert_eq!(accessor.scrolls, 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_escalates() {
        let mut accessor = FlakyAccessor {
            failures: vec![timeout(), timeout(), timeout()],
            scrolls: 0,
        };
        let policy = RetryPolicy::immediate(3);

        let err = retry_accessor_call(&mut accessor, &policy, "scroll", |a| a.scroll())
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.operation, "scroll");
        assert!(matches!(err.source, AccessorError::Timeout(_)));
        assert_eq!(accessor.scrolls, 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let mut accessor = FlakyAccessor {
            failures: vec![AccessorError::NoPage],
            scrolls: 0,
        };
        let policy = RetryPolicy::immediate(5);

        let err = retry_accessor_call(&mut accessor, &policy, "scroll", |a| a.scroll())
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(accessor.scrolls, 1);
    }
}
