//! Retry backoff for failed publishes.

use std::time::Duration;

/// Compute the exponential backoff for a given retry count.
///
/// `delay = base * 2^(retry_count - 1)`, capped at `max`. A retry count
/// of zero or less yields no delay.
pub fn compute_backoff(retry_count: i64, base: Duration, max: Duration) -> chrono::Duration {
    if retry_count <= 0 {
        return chrono::Duration::zero();
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let shift = retry_count.saturating_sub(1).min(u32::MAX as i64) as u32;
    let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(multiplier).min(max_ms);

    chrono::Duration::milliseconds(delay_ms as i64)
}
