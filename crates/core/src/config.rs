//! Engine tuning loaded from an optional JSON file.
//!
//! Every field has a default, so `{}` is a valid configuration.

use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use streak_protocol::Viewport;

use crate::session::DEFAULT_USER_AGENT;

/// Message committed to every contact unless overridden.
pub const DEFAULT_MESSAGE: &str = "🔥 Streak maintenance!";

/// Attempts per contact before a transient failure is final.
pub const MAX_ATTEMPTS: u8 = 3;

/// Delivery engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
	pub message: String,
	pub navigation_timeout_ms: u64,
	/// Bounded visibility wait applied to each selector candidate.
	pub visibility_timeout_ms: u64,
	pub poll_interval_ms: u64,
	/// Tab presses issued before blind typing when no composer is found.
	pub blind_tab_presses: u8,
	pub pacing: PacingConfig,
	pub platform: PlatformProfile,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			message: DEFAULT_MESSAGE.to_string(),
			navigation_timeout_ms: 15_000,
			visibility_timeout_ms: 3_000,
			poll_interval_ms: 250,
			blind_tab_presses: 3,
			pacing: PacingConfig::default(),
			platform: PlatformProfile::default(),
		}
	}
}

impl EngineConfig {
	pub fn navigation_timeout(&self) -> Duration {
		Duration::from_millis(self.navigation_timeout_ms)
	}

	pub fn visibility_timeout(&self) -> Duration {
		Duration::from_millis(self.visibility_timeout_ms)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms.max(1))
	}
}

/// Half-open `[min, max)` interval in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondsRange {
	pub min: f64,
	pub max: f64,
}

impl SecondsRange {
	pub const fn new(min: f64, max: f64) -> Self {
		Self { min, max }
	}

	/// Returns `None` for degenerate or inverted ranges.
	pub fn as_range(&self) -> Option<Range<f64>> {
		(self.max > self.min && self.min >= 0.0).then_some(self.min..self.max)
	}
}

/// Longest single pause a pacing range may ask for.
pub const MAX_PACING_SECS: f64 = 3_600.0;

/// Randomized delay intervals per pacing kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PacingConfig {
	pub pre_action: SecondsRange,
	pub post_reload: SecondsRange,
	pub inter_contact: SecondsRange,
}

impl PacingConfig {
	/// Rejects ranges that are not finite, negative, inverted or longer than
	/// [`MAX_PACING_SECS`].
	pub fn validate(&self) -> Result<(), String> {
		for (name, range) in [("preAction", self.pre_action), ("postReload", self.post_reload), ("interContact", self.inter_contact)] {
			let SecondsRange { min, max } = range;
			if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max || max > MAX_PACING_SECS {
				return Err(format!("pacing.{name} must satisfy 0 <= min <= max <= {MAX_PACING_SECS}, got {min}..{max}"));
			}
		}
		Ok(())
	}
}

impl Default for PacingConfig {
	fn default() -> Self {
		Self {
			pre_action: SecondsRange::new(5.0, 10.0),
			post_reload: SecondsRange::new(10.0, 15.0),
			inter_contact: SecondsRange::new(15.0, 30.0),
		}
	}
}

/// URL shapes and fingerprint of the target platform.
///
/// Templates substitute `{handle}` and `{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformProfile {
	pub base_url: String,
	pub profile_path: String,
	pub conversation_path: String,
	pub inbox_path: String,
	/// Path prefixes of the authentication entry point.
	pub login_paths: Vec<String>,
	pub user_agent: String,
	pub viewport: Viewport,
}

impl Default for PlatformProfile {
	fn default() -> Self {
		Self {
			base_url: "https://www.tiktok.com".to_string(),
			profile_path: "/@{handle}".to_string(),
			conversation_path: "/messages?lang=en&u={id}".to_string(),
			inbox_path: "/messages".to_string(),
			login_paths: vec!["/login".to_string(), "/signup".to_string()],
			user_agent: DEFAULT_USER_AGENT.to_string(),
			viewport: Viewport::default(),
		}
	}
}

impl PlatformProfile {
	/// Platform profile rooted at `base_url` with the default path templates.
	pub fn with_base_url(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			..Self::default()
		}
	}

	fn join(&self, path: &str) -> String {
		format!("{}{}", self.base_url.trim_end_matches('/'), path)
	}

	pub fn profile_url(&self, handle: &str) -> String {
		self.join(&self.profile_path.replace("{handle}", handle))
	}

	pub fn conversation_url(&self, account_id: &str) -> String {
		self.join(&self.conversation_path.replace("{id}", account_id))
	}

	pub fn inbox_url(&self) -> String {
		self.join(&self.inbox_path)
	}

	pub fn login_url(&self) -> String {
		self.join(self.login_paths.first().map(String::as_str).unwrap_or("/login"))
	}

	/// Whether `url` lands on the authentication entry point.
	pub fn is_login_url(&self, url: &str) -> bool {
		let Ok(parsed) = url::Url::parse(url) else {
			return false;
		};
		let path = parsed.path();
		self.login_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
	}
}
