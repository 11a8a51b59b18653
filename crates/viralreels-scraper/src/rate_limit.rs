//! Retry with exponential back-off and jitter for scrape source calls.
//!
//! Rate-limit responses and transport failures are retried; everything else
//! (bad status, unparseable body, failed actor run) is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Upper bound on a single back-off sleep.
const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`]: HTTP 429 from the scraping API.
/// - [`ScraperError::Http`]: network-level failure (connection reset, timeout).
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::RateLimited { .. } | ScraperError::Http(_)
    )
}

/// Executes `operation` with up to `max_retries` additional attempts on
/// transient errors.
///
/// # Backoff schedule (example with `backoff_base_ms = 2_000`)
///
/// | Retry | Sleep before it                 |
/// |-------|---------------------------------|
/// | 1     | 2 000 ms × 2⁰ ± 25 % jitter     |
/// | 2     | 2 000 ms × 2¹ ± 25 % jitter     |
/// | 3     | 2 000 ms × 2² ± 25 % jitter     |
///
/// A server-provided `retry_after_secs` raises the delay floor. Delays are
/// capped at 60 s. On exhaustion the last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                let delay_ms = backoff_delay_ms(backoff_base_ms, attempt, &err);
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient scrape source error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32, err: &ScraperError) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.min(10));
    let floor_ms = match err {
        ScraperError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.saturating_mul(1000),
        _ => 0,
    };
    let capped = computed.max(floor_ms).min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    jittered.min(MAX_DELAY_MS)
}
