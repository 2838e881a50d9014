//! Human-like cadence between actions and between contacts.

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::{MAX_PACING_SECS, PacingConfig, SecondsRange};

/// Which pause is being taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceKind {
	/// Before clicking or typing.
	PreAction,
	/// After reloading the page between attempts.
	PostReload,
	/// Between two contacts.
	InterContact,
}

impl PaceKind {
	pub fn as_str(self) -> &'static str {
		match self {
			PaceKind::PreAction => "pre-action",
			PaceKind::PostReload => "post-reload",
			PaceKind::InterContact => "inter-contact",
		}
	}
}

/// Draws an independent random delay per call from the configured ranges.
pub struct PacingController {
	config: PacingConfig,
	rng: Mutex<StdRng>,
}

impl PacingController {
	pub fn new(config: PacingConfig) -> Self {
		Self {
			config,
			rng: Mutex::new(StdRng::from_entropy()),
		}
	}

	/// Deterministic controller for tests and reproducible dry runs.
	pub fn with_seed(config: PacingConfig, seed: u64) -> Self {
		Self {
			config,
			rng: Mutex::new(StdRng::seed_from_u64(seed)),
		}
	}

	fn range(&self, kind: PaceKind) -> SecondsRange {
		match kind {
			PaceKind::PreAction => self.config.pre_action,
			PaceKind::PostReload => self.config.post_reload,
			PaceKind::InterContact => self.config.inter_contact,
		}
	}

	/// Samples one delay for `kind` without sleeping.
	pub fn sample(&self, kind: PaceKind) -> Duration {
		let range = self.range(kind);
		let secs = match range.as_range() {
			Some(r) => self.rng.lock().gen_range(r),
			None => range.min.max(0.0),
		};
		Duration::try_from_secs_f64(secs.min(MAX_PACING_SECS)).unwrap_or(Duration::ZERO)
	}

	/// Sleeps for a freshly sampled delay.
	pub async fn delay(&self, kind: PaceKind) {
		let wait = self.sample(kind);
		debug!(target = "streak.pacing", kind = kind.as_str(), wait_ms = wait.as_millis() as u64, "pacing");
		tokio::time::sleep(wait).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn controller() -> PacingController {
		PacingController::with_seed(PacingConfig::default(), 7)
	}

	#[test]
	fn inter_contact_stays_in_range() {
		let pacing = controller();
		for _ in 0..5_000 {
			let d = pacing.sample(PaceKind::InterContact).as_secs_f64();
			assert!((15.0..30.0).contains(&d), "inter-contact delay {d} out of range");
		}
	}

	#[test]
	fn pre_action_stays_in_range() {
		let pacing = controller();
		for _ in 0..5_000 {
			let d = pacing.sample(PaceKind::PreAction).as_secs_f64();
			assert!((5.0..10.0).contains(&d), "pre-action delay {d} out of range");
		}
	}

	#[test]
	fn post_reload_stays_in_range() {
		let pacing = controller();
		for _ in 0..5_000 {
			let d = pacing.sample(PaceKind::PostReload).as_secs_f64();
			assert!((10.0..15.0).contains(&d), "post-reload delay {d} out of range");
		}
	}

	#[test]
	fn oversized_range_is_capped_instead_of_panicking() {
		let config = PacingConfig {
			inter_contact: SecondsRange::new(1e30, 1e31),
			..PacingConfig::default()
		};
		let pacing = PacingController::with_seed(config, 7);
		assert_eq!(pacing.sample(PaceKind::InterContact), Duration::from_secs_f64(MAX_PACING_SECS));
	}

	#[test]
	fn consecutive_draws_are_not_a_fixed_schedule() {
		let pacing = controller();
		let draws: Vec<Duration> = (0..20).map(|_| pacing.sample(PaceKind::InterContact)).collect();
		assert!(draws.windows(2).any(|w| w[0] != w[1]));
	}

	#[test]
	fn degenerate_range_uses_minimum() {
		let config = PacingConfig {
			pre_action: SecondsRange::new(0.0, 0.0),
			..PacingConfig::default()
		};
		let pacing = PacingController::with_seed(config, 1);
		assert_eq!(pacing.sample(PaceKind::PreAction), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn delay_sleeps_for_sampled_time() {
		let pacing = controller();
		let start = tokio::time::Instant::now();
		pacing.delay(PaceKind::PreAction).await;
		let elapsed = start.elapsed().as_secs_f64();
		assert!((5.0..10.5).contains(&elapsed), "slept {elapsed}s");
	}
}
