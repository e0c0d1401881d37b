//! Bounded retry with a caller-supplied back-off schedule.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Runs `operation` up to `max_attempts` times.
///
/// `operation` receives the 1-based attempt number. After failed attempt `n`
/// the combinator sleeps `backoff(n)` before trying again, unless
/// `is_retriable` rejects the error or the attempts are exhausted, in which
/// case the last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut, R, B>(
    max_attempts: u32,
    is_retriable: R,
    backoff: B,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    B: Fn(u32) -> Duration,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !is_retriable(&err) {
                    return Err(err);
                }
                let delay = backoff(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "attempt failed, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
