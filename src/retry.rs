// src/retry.rs

//! Bounded retry around flaky provider calls
//!
//! Search and download talk to a remote service and are retried on
//! [`ProviderError`]. Install is never retried here. Nothing leaves this
//! module as an error: once the attempts run out the caller gets a
//! synthetic `Failed` result instead.

use crate::config::Config;
use crate::provider::{ProviderError, SearchResult, UpdateProvider};
use crate::update::{OperationResult, UpdateSet};
use std::time::Duration;
use tracing::{error, warn};

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_attempts, config.retry_delay)
    }

    /// Call `op` until it succeeds or the attempts run out
    ///
    /// Returns `None` after `max_attempts` consecutive provider errors.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Result<T, ProviderError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Some(value),
                Err(e) => {
                    if attempt >= self.max_attempts {
                        error!(
                            "{} failed after {} attempts: {}",
                            operation, attempt, e
                        );
                        return None;
                    }
                    warn!(
                        "{} attempt {} of {} failed: {}, retrying in {}s",
                        operation,
                        attempt,
                        self.max_attempts,
                        e,
                        self.delay.as_secs()
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
            }
        }
    }
}

/// Search with retry; gives up with a failed, empty result
pub fn search_with_retry(
    provider: &mut dyn UpdateProvider,
    policy: &RetryPolicy,
    criteria: &str,
) -> SearchResult {
    policy
        .run("Searching for updates", || provider.search(criteria))
        .unwrap_or_else(SearchResult::failed)
}

/// Download with retry; gives up with a `Failed` result
pub fn download_with_retry(
    provider: &mut dyn UpdateProvider,
    policy: &RetryPolicy,
    updates: &UpdateSet,
) -> OperationResult {
    policy
        .run("Downloading updates", || provider.download(updates))
        .unwrap_or_else(OperationResult::failed)
}

/// Refresh update metadata with retry; `None` if the provider stayed unreachable
pub fn refresh_with_retry(
    provider: &mut dyn UpdateProvider,
    policy: &RetryPolicy,
    updates: &UpdateSet,
) -> Option<UpdateSet> {
    policy.run("Refreshing update status", || provider.refresh(updates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::OperationResultCode;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn test_always_failing_makes_exactly_max_attempts() {
        let mut calls = 0;
        let result: Option<()> = instant(30).run("op", || {
            calls += 1;
            Err(ProviderError::Backend("unreachable".to_string()))
        });

        assert!(result.is_none());
        assert_eq!(calls, 30);
    }

    #[test]
    fn test_recovers_after_transient_errors() {
        let mut calls = 0;
        let result = instant(5).run("op", || {
            calls += 1;
            if calls < 3 {
                Err(ProviderError::Backend("flaky".to_string()))
            } else {
                Ok(calls)
            }
        });

        assert_eq!(result, Some(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_first_success_is_not_retried() {
        let mut calls = 0;
        let result = instant(30).run("op", || {
            calls += 1;
            Ok::<_, ProviderError>(OperationResultCode::Failed)
        });

        // A semantic Failed is a result, not a communication error
        assert_eq!(result, Some(OperationResultCode::Failed));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: Option<()> = instant(0).run("op", || {
            calls += 1;
            Err(ProviderError::Backend("down".to_string()))
        });
        assert_eq!(calls, 1);
    }
}
