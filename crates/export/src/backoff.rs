use std::time::Duration;

/// Sleep before the next poll: `wait * 2^(retry - 1)`, saturating.
///
/// `retry` is 1 after the first non-terminal poll.
pub fn backoff_delay(wait: Duration, retry: u32) -> Duration {
    match 2u32.checked_pow(retry.saturating_sub(1)) {
        Some(factor) => wait.checked_mul(factor).unwrap_or(Duration::MAX),
        None if wait.is_zero() => Duration::ZERO,
        None => Duration::MAX,
    }
}
