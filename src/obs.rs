//! Observability for token requests.
//!
//! Every HTTP attempt against the token endpoint produces exactly one observation labeled with
//! the 1-based `attempt` index and the HTTP status `code` (`"0"` for transport failures). Each
//! connection owns its own counter vector, so two connections sharing a subsystem never fight
//! over a registry; with the `metrics` feature enabled the same observation is also forwarded to
//! the global [`metrics`] recorder under `<subsystem>_token_request_count` with the identical,
//! fixed label set.

// std
use std::collections::HashMap;
// self
use crate::_prelude::*;

const COUNTER_SUFFIX: &str = "_token_request_count";

/// Per-connection counter vector for token endpoint attempts.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	name: Option<String>,
	counts: Mutex<HashMap<(u32, String), u64>>,
}
impl TokenMetrics {
	/// Creates a sink recording under `<subsystem>_token_request_count`.
	///
	/// An empty subsystem disables forwarding to the global recorder; attempts are still counted
	/// locally.
	pub fn new(subsystem: impl Into<String>) -> Self {
		let subsystem = subsystem.into();

		Self {
			name: (!subsystem.is_empty()).then(|| format!("{subsystem}{COUNTER_SUFFIX}")),
			counts: Default::default(),
		}
	}

	/// Returns the metric name, when a subsystem was configured.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the number of observations recorded for an attempt/code pair.
	///
	/// Transport failures record under code `0`.
	pub fn count(&self, attempt: u32, code: u16) -> u64 {
		self.counts.lock().get(&(attempt, code.to_string())).copied().unwrap_or(0)
	}

	pub(crate) fn observe(&self, attempt: u32, code: &str) {
		*self.counts.lock().entry((attempt, code.to_owned())).or_insert(0) += 1;

		#[cfg(feature = "metrics")]
		if let Some(name) = &self.name {
			metrics::counter!(
				name.clone(),
				"attempt" => attempt.to_string(),
				"code" => code.to_owned()
			)
			.increment(1);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn name_derives_from_the_subsystem() {
		assert_eq!(TokenMetrics::new("my_sdk").name(), Some("my_sdk_token_request_count"));
		assert_eq!(TokenMetrics::new("").name(), None);
		assert_eq!(TokenMetrics::default().name(), None);
	}

	#[test]
	fn observations_accumulate_per_label_pair() {
		let metrics = TokenMetrics::new("test_subsystem");

		metrics.observe(1, "500");
		metrics.observe(2, "502");
		metrics.observe(2, "502");
		metrics.observe(3, "0");

		assert_eq!(metrics.count(1, 500), 1);
		assert_eq!(metrics.count(2, 502), 2);
		assert_eq!(metrics.count(3, 0), 1);
		assert_eq!(metrics.count(4, 200), 0);
	}

	#[test]
	fn same_subsystem_twice_does_not_conflict() {
		let first = TokenMetrics::new("shared");
		let second = TokenMetrics::new("shared");

		first.observe(1, "200");
		second.observe(1, "200");

		assert_eq!(first.count(1, 200), 1);
		assert_eq!(second.count(1, 200), 1);
	}
}
