use lr_fs_watcher::RetryPolicy;

use std::{env, str::FromStr, time::Duration};

use tracing::warn;

const DEBOUNCE_ENV: &str = "LNKREAPER_DEBOUNCE_MS";
const MAX_ATTEMPTS_ENV: &str = "LNKREAPER_MAX_ATTEMPTS";
const BASE_DELAY_ENV: &str = "LNKREAPER_BASE_DELAY_MS";
const STEP_ENV: &str = "LNKREAPER_STEP_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
	/// Wait between a relocation notification and re-resolving the desktop path.
	///
	/// Not derived from a measured race: the change may be reported before the new
	/// path reads back, and this margin has been enough so far.
	pub debounce: Duration,
	pub retry: RetryPolicy,
}

impl Default for ReaperConfig {
	fn default() -> Self {
		Self {
			debounce: Duration::from_millis(100),
			retry: RetryPolicy::default(),
		}
	}
}

impl ReaperConfig {
	/// Defaults, overridden by any `LNKREAPER_*` variables set in the environment.
	#[must_use]
	pub fn from_env() -> Self {
		Self::from_lookup(|key| env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();

		if let Some(millis) = parse_var::<u64>(&lookup, DEBOUNCE_ENV) {
			config.debounce = Duration::from_millis(millis);
		}
		match parse_var::<u32>(&lookup, MAX_ATTEMPTS_ENV) {
			Some(0) => {
				warn!(key = MAX_ATTEMPTS_ENV, "At least one attempt is needed, keeping default;");
			}
			Some(attempts) => config.retry.max_attempts = attempts,
			None => {}
		}
		if let Some(millis) = parse_var::<u64>(&lookup, BASE_DELAY_ENV) {
			config.retry.base_delay = Duration::from_millis(millis);
		}
		if let Some(millis) = parse_var::<u64>(&lookup, STEP_ENV) {
			config.retry.step = Duration::from_millis(millis);
		}

		config
	}
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
	let raw = lookup(key)?;

	match raw.trim().parse() {
		Ok(value) => Some(value),
		Err(_) => {
			warn!(%key, %raw, "Ignoring unparsable configuration value;");
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::HashMap;

	fn config_from(vars: &[(&str, &str)]) -> ReaperConfig {
		let vars = vars
			.iter()
			.map(|(key, value)| ((*key).to_string(), (*value).to_string()))
			.collect::<HashMap<_, _>>();

		ReaperConfig::from_lookup(|key| vars.get(key).cloned())
	}

	#[test]
	fn defaults_match_reference_behaviour() {
		let config = config_from(&[]);

		assert_eq!(config, ReaperConfig::default());
		assert_eq!(config.debounce, Duration::from_millis(100));
		assert_eq!(config.retry.max_attempts, 10);
		assert_eq!(config.retry.delay_for(9), Duration::from_millis(1000));
	}

	#[test]
	fn environment_overrides_apply() {
		let config = config_from(&[
			(DEBOUNCE_ENV, "250"),
			(MAX_ATTEMPTS_ENV, " 4 "),
			(BASE_DELAY_ENV, "50"),
			(STEP_ENV, "25"),
		]);

		assert_eq!(config.debounce, Duration::from_millis(250));
		assert_eq!(
			config.retry,
			RetryPolicy {
				max_attempts: 4,
				base_delay: Duration::from_millis(50),
				step: Duration::from_millis(25),
			}
		);
	}

	#[test]
	fn garbage_values_are_ignored() {
		let config = config_from(&[(DEBOUNCE_ENV, "soon"), (MAX_ATTEMPTS_ENV, "-1")]);

		assert_eq!(config, ReaperConfig::default());
	}

	#[test]
	fn zero_attempts_keeps_default() {
		let config = config_from(&[(MAX_ATTEMPTS_ENV, "0")]);

		assert_eq!(config.retry.max_attempts, 10);
	}

	#[test]
	fn huge_step_does_not_overflow_backoff() {
		let config = config_from(&[(STEP_ENV, "18446744073709551615")]);

		assert!(config.retry.delay_for(9) >= Duration::from_millis(u64::MAX));
		assert_eq!(config.retry.delay_for(u32::MAX), Duration::MAX);
	}
}
