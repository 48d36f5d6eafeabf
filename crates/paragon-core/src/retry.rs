//! Retry with exponential backoff for external calls

use std::time::Duration;

use crate::api::ApiError;

/// Default attempt bound for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Retry a fallible external call with exponential backoff.
///
/// Retries only retryable errors, up to `max_retries` additional attempts.
/// Returns `Ok(T)` on first success, or the final `Err` on exhaustion or a
/// non-retryable error (quota, malformed response).
pub fn retry_with_backoff<T>(
    label: &str,
    max_retries: u32,
    mut attempt_fn: impl FnMut() -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                log::debug!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                std::thread::sleep(backoff_duration(attempt));
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}
