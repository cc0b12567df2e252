//! Retry classification and backoff math

use std::time::Duration;

use rand::Rng;

/// Base delay for exponential backoff.
pub const BASE_DELAY_MS: u64 = 1000;
/// Upper bound (exclusive) of the uniform jitter added to every delay.
pub const JITTER_MS: u64 = 1000;
/// Cap on the computed delay.
pub const MAX_DELAY_MS: u64 = 30_000;

/// Outcome class of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// 2xx - batch acknowledged
    Success,
    /// 4xx - rejected; drop without retry
    Terminal,
    /// 5xx or transport failure - requeue with backoff
    Retryable,
}

/// Classify a transport status code.
///
/// Anything that is neither 2xx nor 4xx is treated as retryable; the
/// response carries no other signal the dispatcher trusts.
pub fn classify_status(status: u16) -> RetryClass {
    match status {
        200..=299 => RetryClass::Success,
        400..=499 => RetryClass::Terminal,
        _ => RetryClass::Retryable,
    }
}

/// Backoff delay for the given retry ordinal (0 = first retry):
/// `base * 2^attempt + uniform[0, 1s)`, capped at [`MAX_DELAY_MS`].
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponential = BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(15));
    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
    Duration::from_millis(exponential.saturating_add(jitter).min(MAX_DELAY_MS))
}
