//! Retry delay computation.

use rand::Rng;
use std::time::Duration;

/// Capped exponential retry delay for a failed attempt.
///
/// `delay = min(base × 2^(attempt − 1), max)`, scaled by a factor drawn
/// uniformly from `[1 − jitter, 1]`. Attempt numbering starts at 1; a zero
/// jitter makes the function deterministic.
pub fn retry_delay(attempt: u32, base_ms: u64, max_ms: u64, jitter: f64) -> Duration {
	let exponent = attempt.saturating_sub(1).min(63);
	let raw = base_ms
		.checked_mul(1u64 << exponent)
		.unwrap_or(max_ms)
		.min(max_ms);

	let jitter = jitter.clamp(0.0, 1.0);
	if jitter == 0.0 {
		return Duration::from_millis(raw);
	}

	let scale = rand::thread_rng().gen_range(1.0 - jitter..=1.0);
	Duration::from_millis((raw as f64 * scale) as u64)
}
