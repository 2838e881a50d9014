//! Authenticated browsing state shared read-only by the engine.

use std::time::{SystemTime, UNIX_EPOCH};

use streak_protocol::{Cookie, StorageError, StorageState, Viewport};
use thiserror::Error;

/// Desktop Chrome user agent presented by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Malformed or unusable session input. Always a configuration error.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("session data is not valid cookie JSON: {0}")]
	Malformed(#[from] StorageError),

	#[error("session data contains no cookies")]
	Empty,

	#[error("cookie #{index} has an empty name")]
	UnnamedCookie { index: usize },

	#[error("cookie `{name}` has neither a domain nor a URL scope")]
	Unscoped { name: String },
}

/// Cookies and fingerprint parameters for one run.
///
/// Built once from configuration and then only borrowed. Validity is never
/// assumed from the cookies themselves; the delivery engine detects
/// invalidation from page state.
#[derive(Debug, Clone)]
pub struct SessionContext {
	cookies: Vec<Cookie>,
	user_agent: String,
	viewport: Viewport,
}

impl SessionContext {
	/// Validates cookie records and wraps them with default fingerprint values.
	pub fn new(cookies: Vec<Cookie>) -> Result<Self, SessionError> {
		if cookies.is_empty() {
			return Err(SessionError::Empty);
		}
		for (index, cookie) in cookies.iter().enumerate() {
			if cookie.name.trim().is_empty() {
				return Err(SessionError::UnnamedCookie { index });
			}
			if cookie.domain.as_deref().is_none_or(|d| d.trim().is_empty()) {
				return Err(SessionError::Unscoped { name: cookie.name.clone() });
			}
		}

		Ok(Self {
			cookies,
			user_agent: DEFAULT_USER_AGENT.to_string(),
			viewport: Viewport::default(),
		})
	}

	/// Parses a serialized cookie collection (bare array or storage state).
	pub fn from_json(raw: &str) -> Result<Self, SessionError> {
		let state = StorageState::from_json(raw)?;
		Self::new(state.cookies)
	}

	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();
		self
	}

	pub fn with_viewport(mut self, viewport: Viewport) -> Self {
		self.viewport = viewport;
		self
	}

	pub fn cookies(&self) -> &[Cookie] {
		&self.cookies
	}

	pub fn user_agent(&self) -> &str {
		&self.user_agent
	}

	pub fn viewport(&self) -> Viewport {
		self.viewport
	}

	/// Returns `true` when every cookie that carries an expiry has passed it.
	///
	/// This is only a hint for the operator; session-scoped cookies never count.
	pub fn looks_expired_at(&self, now_secs: f64) -> bool {
		let mut dated = self.cookies.iter().filter(|c| !c.is_session()).peekable();
		dated.peek().is_some() && dated.all(|c| c.is_expired_at(now_secs))
	}

	pub fn looks_expired(&self) -> bool {
		let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0);
		self.looks_expired_at(now)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_empty_cookie_list() {
		assert!(matches!(SessionContext::from_json("[]"), Err(SessionError::Empty)));
		assert!(matches!(SessionContext::from_json("{}"), Err(SessionError::Empty)));
	}

	#[test]
	fn rejects_malformed_json() {
		assert!(matches!(SessionContext::from_json("{cookies"), Err(SessionError::Malformed(_))));
	}

	#[test]
	fn rejects_unscoped_cookie() {
		let err = SessionContext::from_json(r#"[{"name": "sid", "value": "1"}]"#).unwrap_err();
		assert!(matches!(err, SessionError::Unscoped { ref name } if name == "sid"));
	}

	#[test]
	fn rejects_unnamed_cookie() {
		let err = SessionContext::from_json(r#"[{"name": " ", "value": "1", "domain": ".x.com"}]"#).unwrap_err();
		assert!(matches!(err, SessionError::UnnamedCookie { index: 0 }));
	}

	#[test]
	fn accepts_valid_cookies_with_defaults() {
		let session = SessionContext::from_json(r#"[{"name": "sid", "value": "1", "domain": ".x.com"}]"#).unwrap();
		assert_eq!(session.cookies().len(), 1);
		assert_eq!(session.user_agent(), DEFAULT_USER_AGENT);
		assert_eq!(session.viewport(), Viewport::default());
	}

	#[test]
	fn expiry_hint_ignores_session_cookies() {
		let session = SessionContext::from_json(
			r#"[
				{"name": "sid", "value": "1", "domain": ".x.com", "expires": 100.0},
				{"name": "tmp", "value": "2", "domain": ".x.com", "expires": -1}
			]"#,
		)
		.unwrap();
		assert!(session.looks_expired_at(200.0));
		assert!(!session.looks_expired_at(50.0));

		let session_only = SessionContext::from_json(r#"[{"name": "tmp", "value": "2", "domain": ".x.com"}]"#).unwrap();
		assert!(!session_only.looks_expired_at(f64::MAX));
	}
}
