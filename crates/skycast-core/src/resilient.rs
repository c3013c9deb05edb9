//! Resilient request execution: timeout + retry policy + cancellation.
//!
//! Every outbound HTTP call in the application goes through [`send_with_retry`]
//! so that timeout handling, retry classification and cancellation behave the
//! same everywhere.
//!
//! Retryable failures:
//! - No response received (connect errors, timeouts)
//! - 503/504-class statuses
//!
//! Everything else (including other 4xx/5xx) surfaces immediately.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::error::{classify_status, FetchError, ReqwestErrorExt};

/// Default retry configuration
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial request
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Policy that never retries. Used for read-only diagnostic calls.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Should retry the request
    Retry,
    /// Should not retry - permanent failure
    NoRetry,
}

/// Check if a status code is retryable.
///
/// Only 503/504 count as transient. Other 5xx responses mean the server
/// processed the request and failed; retrying those hammers a broken
/// endpoint without helping the user.
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            tracing::debug!("Transient status ({}), will retry", status);
            RetryDecision::Retry
        }
        _ => RetryDecision::NoRetry,
    }
}

/// Check if a reqwest error is retryable
pub fn is_retryable_error(error: &reqwest::Error) -> RetryDecision {
    // No response received at all
    if error.is_timeout() {
        tracing::debug!("Request timed out, will retry");
        return RetryDecision::Retry;
    }

    if error.is_connect() {
        tracing::debug!("Connection error, will retry");
        return RetryDecision::Retry;
    }

    RetryDecision::NoRetry
}

/// Execute an HTTP request with retry and cancellation.
///
/// # Arguments
/// * `policy` - Retry configuration
/// * `cancel` - Token aborting the whole operation, including retry waits
/// * `operation` - Async closure that performs the HTTP request
///
/// # Returns
/// The successful response, or the classified error once retries are
/// exhausted or a non-retryable failure occurs.
///
/// # Example
/// ```ignore
/// let response = send_with_retry(&RetryPolicy::default(), &cancel, || {
///     client.get(url.clone()).send()
/// })
/// .await?;
/// ```
pub async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<Response, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = operation() => result,
        };

        match outcome {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    if attempt > 0 {
                        tracing::info!("Request succeeded after {} retries", attempt);
                    }
                    return Ok(response);
                }

                if is_retryable_status(status) == RetryDecision::Retry
                    && attempt < policy.max_retries
                {
                    attempt += 1;
                    tracing::warn!(
                        "Request returned {}, retry {} of {}",
                        status,
                        attempt,
                        policy.max_retries
                    );
                    wait_or_cancel(policy.delay, cancel).await?;
                    continue;
                }

                let message = response.text().await.unwrap_or_default();
                return Err(classify_status(status.as_u16(), message));
            }
            Err(e) => {
                if is_retryable_error(&e) == RetryDecision::Retry && attempt < policy.max_retries {
                    attempt += 1;
                    tracing::warn!(
                        "Retryable error on attempt {} of {}: {}",
                        attempt,
                        policy.max_retries + 1,
                        e
                    );
                    wait_or_cancel(policy.delay, cancel).await?;
                    continue;
                }

                tracing::debug!("Non-retryable or exhausted error: {}", e);
                return Err(e.into_fetch_error());
            }
        }
    }
}

/// Sleep for the retry delay, aborting early if the token fires.
async fn wait_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), FetchError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[test]
    fn test_none_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
    }

    #[test]
    fn test_retryable_status_codes() {
        assert_eq!(
            is_retryable_status(StatusCode::SERVICE_UNAVAILABLE),
            RetryDecision::Retry
        );
        assert_eq!(
            is_retryable_status(StatusCode::GATEWAY_TIMEOUT),
            RetryDecision::Retry
        );

        // Non-transient server errors are NOT retried
        assert_eq!(
            is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR),
            RetryDecision::NoRetry
        );
        assert_eq!(
            is_retryable_status(StatusCode::BAD_GATEWAY),
            RetryDecision::NoRetry
        );

        // Client errors are NOT retried
        assert_eq!(
            is_retryable_status(StatusCode::BAD_REQUEST),
            RetryDecision::NoRetry
        );
        assert_eq!(
            is_retryable_status(StatusCode::NOT_FOUND),
            RetryDecision::NoRetry
        );

        assert_eq!(is_retryable_status(StatusCode::OK), RetryDecision::NoRetry);
    }
}
