//! Retry classification and backoff schedule for token requests.

// std
use std::time::Duration;

/// Hard cap on attempts per dispatch, deadline permitting.
pub(crate) const MAX_ATTEMPTS: u32 = 100;

const BASE_DELAY: Duration = Duration::from_millis(20);
const MAX_DELAY: Duration = Duration::from_secs(1);
const MULTIPLIER: u32 = 2;

/// Returns `true` when a status code is worth retrying.
///
/// Only server-side failures retry; 4xx responses reflect the request itself and repeat
/// identically.
pub(crate) fn retryable_status(status: u16) -> bool {
	(500..600).contains(&status)
}

/// Returns the wait before the next attempt, doubling from the base up to the cap.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
	let exponent = attempt.saturating_sub(1).min(16);

	BASE_DELAY.saturating_mul(MULTIPLIER.saturating_pow(exponent)).min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn server_errors_retry_client_errors_do_not() {
		assert!(retryable_status(500));
		assert!(retryable_status(502));
		assert!(retryable_status(599));
		assert!(!retryable_status(400));
		assert!(!retryable_status(403));
		assert!(!retryable_status(404));
		assert!(!retryable_status(200));
	}

	#[test]
	fn backoff_doubles_from_the_base() {
		assert_eq!(backoff_delay(1), Duration::from_millis(20));
		assert_eq!(backoff_delay(2), Duration::from_millis(40));
		assert_eq!(backoff_delay(3), Duration::from_millis(80));
	}

	#[test]
	fn backoff_is_capped() {
		assert_eq!(backoff_delay(7), MAX_DELAY);
		assert_eq!(backoff_delay(MAX_ATTEMPTS), MAX_DELAY);
	}
}
