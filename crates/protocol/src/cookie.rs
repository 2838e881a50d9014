//! Cookie records as exported by a browser context.

use serde::{Deserialize, Serialize};

/// `SameSite` attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	Strict,
	Lax,
	#[serde(rename = "None", alias = "no_restriction", alias = "unspecified")]
	None,
}

/// A single cookie record.
///
/// `expires` is seconds since the Unix epoch; `-1` (or absence) marks a
/// session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
}

impl Cookie {
	/// Returns `true` for cookies without a positive expiry timestamp.
	pub fn is_session(&self) -> bool {
		self.expires.is_none_or(|ts| ts <= 0.0)
	}

	/// Returns `true` when the cookie carries an expiry at or before `now_secs`.
	pub fn is_expired_at(&self, now_secs: f64) -> bool {
		match self.expires {
			Some(ts) if ts > 0.0 => ts <= now_secs,
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_exported_cookie() {
		let json = r#"{
			"name": "sessionid",
			"value": "abc",
			"domain": ".tiktok.com",
			"path": "/",
			"expires": 1893456000.5,
			"httpOnly": true,
			"secure": true,
			"sameSite": "Lax"
		}"#;
		let cookie: Cookie = serde_json::from_str(json).unwrap();
		assert_eq!(cookie.name, "sessionid");
		assert_eq!(cookie.http_only, Some(true));
		assert_eq!(cookie.same_site, Some(SameSite::Lax));
		assert!(!cookie.is_session());
	}

	#[test]
	fn minimal_cookie_is_session_scoped() {
		let cookie: Cookie = serde_json::from_str(r#"{"name": "a", "value": "b"}"#).unwrap();
		assert!(cookie.is_session());
		assert!(!cookie.is_expired_at(f64::MAX));
	}

	#[test]
	fn expiry_compares_against_now() {
		let cookie: Cookie = serde_json::from_str(r#"{"name": "a", "value": "b", "expires": 100.0}"#).unwrap();
		assert!(cookie.is_expired_at(100.0));
		assert!(!cookie.is_expired_at(99.0));
	}

	#[test]
	fn same_site_accepts_extension_spelling() {
		let cookie: Cookie = serde_json::from_str(r#"{"name": "a", "value": "b", "sameSite": "no_restriction"}"#).unwrap();
		assert_eq!(cookie.same_site, Some(SameSite::None));
	}
}
