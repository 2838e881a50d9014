//! Target resolution: from a contact identifier to a conversation endpoint.
//!
//! Strategies, first success wins:
//! 1. A full URL is used directly as the profile endpoint.
//! 2. Otherwise a profile URL is synthesized from the handle.
//! 3. On the profile page, a numeric account id embedded in inline page
//!    state yields a direct conversation URL, bypassing the UI entirely.
//! 4. Failing that, the cascade looks for an "open conversation" control.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PlatformProfile;
use crate::error::EngineError;
use crate::page::BrowserPage;
use crate::selector::{ControlHandle, Role, SelectorCascade};

static ACCOUNT_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	[
		r#""userInfo"\s*:\s*\{\s*"user"\s*:\s*\{\s*"id"\s*:\s*"(\d{5,})""#,
		r#""authorId"\s*:\s*"(\d{5,})""#,
		r#""uid"\s*:\s*"(\d{5,})""#,
	]
	.iter()
	.map(|p| Regex::new(p).expect("account id pattern should compile"))
	.collect()
});

/// A caller-supplied conversation target: a bare handle or a full URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact(String);

impl Contact {
	/// Trims whitespace; returns `None` for blank input.
	pub fn parse(raw: &str) -> Option<Self> {
		let trimmed = raw.trim();
		(!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether the identifier is already a navigable reference.
	pub fn is_direct_reference(&self) -> bool {
		url::Url::parse(&self.0).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
	}

	/// Handle without a leading `@`, for synthesized URLs.
	pub fn handle(&self) -> &str {
		self.0.trim_start_matches('@')
	}
}

impl std::fmt::Display for Contact {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// How the profile endpoint was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
	DirectReference,
	SynthesizedProfile,
}

/// The concrete endpoint the delivery engine activates.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
	/// Direct conversation URL built from an embedded account id.
	Conversation { url: String, account_id: String },
	/// A control on the current page that opens the conversation.
	Control(ControlHandle),
}

/// Result of resolving one contact. Consumed once; never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
	pub contact: Contact,
	pub profile_url: String,
	pub source: ProfileSource,
	pub endpoint: Endpoint,
}

#[derive(Debug, Error)]
pub enum ResolveError {
	#[error("no conversation endpoint found for {contact}")]
	NotFound { contact: Contact },

	#[error(transparent)]
	Engine(#[from] EngineError),
}

/// Extracts the first embedded numeric account id from page HTML.
pub fn extract_account_id(html: &str) -> Option<String> {
	ACCOUNT_ID_PATTERNS
		.iter()
		.find_map(|re| re.captures(html))
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str().to_string())
}

pub struct TargetResolver<'a> {
	platform: &'a PlatformProfile,
	cascade: &'a SelectorCascade,
	navigation_timeout: std::time::Duration,
}

impl<'a> TargetResolver<'a> {
	pub fn new(platform: &'a PlatformProfile, cascade: &'a SelectorCascade, navigation_timeout: std::time::Duration) -> Self {
		Self {
			platform,
			cascade,
			navigation_timeout,
		}
	}

	/// Profile URL and the strategy that produced it.
	pub fn profile_endpoint(&self, contact: &Contact) -> (String, ProfileSource) {
		if contact.is_direct_reference() {
			(contact.as_str().to_string(), ProfileSource::DirectReference)
		} else {
			(self.platform.profile_url(contact.handle()), ProfileSource::SynthesizedProfile)
		}
	}

	/// Navigates to the contact's profile and finds a conversation endpoint.
	///
	/// A navigation timeout is logged and resolution continues against the
	/// partially loaded page.
	pub async fn resolve(&self, contact: &Contact, page: &dyn BrowserPage) -> Result<ResolvedTarget, ResolveError> {
		let (profile_url, source) = self.profile_endpoint(contact);
		debug!(target = "streak.resolve", contact = %contact, url = %profile_url, ?source, "navigating to profile");

		match page.goto(&profile_url, self.navigation_timeout).await {
			Ok(()) => {}
			Err(err) if err.is_timeout() => {
				warn!(target = "streak.resolve", contact = %contact, url = %profile_url, error = %err, "profile load timed out, continuing with partial page");
			}
			Err(err) => return Err(err.into()),
		}

		let endpoint = match page.content().await.ok().as_deref().and_then(extract_account_id) {
			Some(account_id) => {
				let url = self.platform.conversation_url(&account_id);
				info!(target = "streak.resolve", contact = %contact, %account_id, "resolved via embedded account id");
				Endpoint::Conversation { url, account_id }
			}
			None => match self.cascade.locate(Role::OpenConversation, page).await {
				Ok(handle) => {
					info!(target = "streak.resolve", contact = %contact, candidate = handle.candidate, "resolved via conversation control");
					Endpoint::Control(handle)
				}
				Err(_) => return Err(ResolveError::NotFound { contact: contact.clone() }),
			},
		};

		Ok(ResolvedTarget {
			contact: contact.clone(),
			profile_url,
			source,
			endpoint,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn contact_parse_trims_and_rejects_blank() {
		assert_eq!(Contact::parse("  alice \n").unwrap().as_str(), "alice");
		assert!(Contact::parse("   ").is_none());
	}

	#[test]
	fn direct_reference_requires_http_scheme() {
		assert!(Contact::parse("https://platform.example/@bob").unwrap().is_direct_reference());
		assert!(!Contact::parse("alice").unwrap().is_direct_reference());
		assert!(!Contact::parse("mailto:bob@example.com").unwrap().is_direct_reference());
	}

	#[test]
	fn handle_strips_at_sign() {
		assert_eq!(Contact::parse("@alice").unwrap().handle(), "alice");
	}

	#[test]
	fn extracts_id_from_rehydration_state() {
		let html = r#"<script id="__UNIVERSAL_DATA_FOR_REHYDRATION__">{"webapp.user-detail":{"userInfo":{"user":{"id":"6812345678901234567","uniqueId":"alice"}}}}</script>"#;
		assert_eq!(extract_account_id(html).as_deref(), Some("6812345678901234567"));
	}

	#[test]
	fn falls_back_to_secondary_id_patterns() {
		assert_eq!(extract_account_id(r#"{"authorId":"123456789"}"#).as_deref(), Some("123456789"));
		assert_eq!(extract_account_id(r#"{"uid": "9876543"}"#).as_deref(), Some("9876543"));
	}

	#[test]
	fn ignores_short_or_missing_ids() {
		assert_eq!(extract_account_id(r#"{"uid":"12"}"#), None);
		assert_eq!(extract_account_id("<html></html>"), None);
	}

	#[test]
	fn profile_endpoint_picks_strategy() {
		let platform = PlatformProfile::with_base_url("https://platform.example");
		let cascade = SelectorCascade::new(std::time::Duration::from_secs(1), std::time::Duration::from_millis(100));
		let resolver = TargetResolver::new(&platform, &cascade, std::time::Duration::from_secs(5));

		let (url, source) = resolver.profile_endpoint(&Contact::parse("alice").unwrap());
		assert_eq!(url, "https://platform.example/@alice");
		assert_eq!(source, ProfileSource::SynthesizedProfile);

		let (url, source) = resolver.profile_endpoint(&Contact::parse("https://platform.example/@bob").unwrap());
		assert_eq!(url, "https://platform.example/@bob");
		assert_eq!(source, ProfileSource::DirectReference);
	}
}
