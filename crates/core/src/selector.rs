//! Selector cascade: ordered structural heuristics per semantic UI role.
//!
//! The target UI ships several DOM shapes for the same control (A/B tests,
//! localization, responsive breakpoints). Each [`Role`] owns a static,
//! priority-ordered list of [`SelectorCandidate`]s, most specific first and
//! ending in a broad text match. [`SelectorCascade::locate`] walks that list
//! and returns the first candidate whose element becomes visible within a
//! bounded wait.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::error::Result;
use crate::page::{BrowserPage, ElementQuery, TextMatch};

/// Semantic roles the engine needs to find on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
	/// Control on a profile page that opens the conversation with that account.
	OpenConversation,
	/// Message composition input inside an open conversation.
	ComposeInput,
	/// Bubble rendering a message in the open conversation.
	MessageBubble,
	/// Captcha, verification or rate-limit surface.
	ChallengeMarker,
	/// Logged-out affordances on an otherwise normal page.
	LoginPrompt,
}

impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Role::OpenConversation => "open-conversation",
			Role::ComposeInput => "compose-input",
			Role::MessageBubble => "message-bubble",
			Role::ChallengeMarker => "challenge-marker",
			Role::LoginPrompt => "login-prompt",
		}
	}

	/// Ordered candidates for this role, highest priority first.
	pub fn candidates(self) -> &'static [SelectorCandidate] {
		match self {
			Role::OpenConversation => OPEN_CONVERSATION,
			Role::ComposeInput => COMPOSE_INPUT,
			Role::MessageBubble => MESSAGE_BUBBLE,
			Role::ChallengeMarker => CHALLENGE_MARKER,
			Role::LoginPrompt => LOGIN_PROMPT,
		}
	}
}

impl std::fmt::Display for Role {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One way to locate a role: a CSS pattern plus an optional text matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorCandidate {
	pub name: &'static str,
	pub css: &'static str,
	pub text: &'static [&'static str],
}

impl SelectorCandidate {
	const fn css(name: &'static str, css: &'static str) -> Self {
		Self { name, css, text: &[] }
	}

	const fn text(name: &'static str, css: &'static str, text: &'static [&'static str]) -> Self {
		Self { name, css, text }
	}

	pub fn query(&self) -> ElementQuery {
		let query = ElementQuery::css(self.css);
		if self.text.is_empty() {
			query
		} else {
			query.with_text(TextMatch::any(self.text))
		}
	}

	/// Same structural pattern, filtered by text supplied at runtime.
	pub fn query_with_text(&self, text: &str) -> ElementQuery {
		ElementQuery::css(self.css).with_text(TextMatch::any([text]))
	}
}

const OPEN_CONVERSATION: &[SelectorCandidate] = &[
	SelectorCandidate::css("e2e-user-message", r#"[data-e2e="user-message"]"#),
	SelectorCandidate::css("e2e-message-button", r#"[data-e2e="message-button"]"#),
	SelectorCandidate::css("profile-messages-link", r#"a[href*="/messages"]"#),
	SelectorCandidate::text(
		"button-text",
		r#"button, [role="button"]"#,
		&["message", "nachricht", "mensaje", "messaggio", "mensagem", "сообщение"],
	),
];

const COMPOSE_INPUT: &[SelectorCandidate] = &[
	SelectorCandidate::css("e2e-input-area", r#"[data-e2e="message-input-area"] div[contenteditable="true"]"#),
	SelectorCandidate::css("editable-textbox", r#"div[contenteditable="true"][role="textbox"]"#),
	SelectorCandidate::css("editable-div", r#"div[contenteditable="true"]"#),
	SelectorCandidate::css("textarea", "textarea"),
	SelectorCandidate::text(
		"placeholder-text",
		r#"[contenteditable], [role="textbox"], input[type="text"]"#,
		&["send a message", "message", "nachricht", "mensaje", "messaggio", "mensagem"],
	),
];

const MESSAGE_BUBBLE: &[SelectorCandidate] = &[
	SelectorCandidate::css("e2e-chat-item", r#"[data-e2e="chat-item"]"#),
	SelectorCandidate::css("chat-item-class", r#"[class*="ChatItem"]"#),
	SelectorCandidate::css("message-class", r#"[class*="message-content"], [class*="MessageContent"]"#),
];

const CHALLENGE_MARKER: &[SelectorCandidate] = &[
	SelectorCandidate::css("captcha-image", "#captcha-verify-image"),
	SelectorCandidate::css("captcha-container", r#".captcha_verify_container, [class*="captcha"], [id*="captcha"]"#),
	SelectorCandidate::css("captcha-frame", r#"iframe[src*="captcha"], iframe[src*="verify"]"#),
	SelectorCandidate::text(
		"alert-text",
		r#"[role="alert"], [role="dialog"], [class*="toast"]"#,
		&["verify to continue", "security check", "too fast", "try again later", "unusual activity"],
	),
];

const LOGIN_PROMPT: &[SelectorCandidate] = &[
	SelectorCandidate::css("e2e-top-login", r#"[data-e2e="top-login-button"]"#),
	SelectorCandidate::css("header-login", "#header-login-button"),
	SelectorCandidate::css("login-modal", r#"[data-e2e="login-modal"]"#),
];

/// A live control found by the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlHandle {
	pub role: Role,
	/// Position of the winning candidate in the role's list.
	pub priority: usize,
	pub candidate: &'static str,
	pub query: ElementQuery,
	/// Index among the candidate's matches.
	pub nth: usize,
}

impl ControlHandle {
	pub async fn click(&self, page: &dyn BrowserPage) -> Result<()> {
		page.click(&self.query, self.nth).await
	}

	pub async fn fill(&self, page: &dyn BrowserPage, text: &str) -> Result<()> {
		page.fill(&self.query, self.nth, text).await
	}
}

/// Every candidate for a role was exhausted.
#[derive(Debug, Error)]
#[error("no visible control for role `{role}` after {tried} candidates")]
pub struct NotFound {
	pub role: Role,
	pub tried: usize,
}

/// Generic resolution over a role's candidate list.
#[derive(Debug, Clone)]
pub struct SelectorCascade {
	visibility_timeout: Duration,
	poll_interval: Duration,
}

impl SelectorCascade {
	pub fn new(visibility_timeout: Duration, poll_interval: Duration) -> Self {
		Self {
			visibility_timeout,
			poll_interval,
		}
	}

	/// First visible control for `role`, in priority order.
	///
	/// Each candidate gets one bounded visibility wait; later candidates are
	/// never queried once one succeeds. Query errors on a candidate (stale
	/// nodes, evaluation failures) count as a miss for that candidate.
	pub async fn locate(&self, role: Role, page: &dyn BrowserPage) -> std::result::Result<ControlHandle, NotFound> {
		let candidates = role.candidates();
		for (priority, candidate) in candidates.iter().enumerate() {
			let query = candidate.query();
			if let Some(nth) = self.wait_visible(page, &query).await {
				debug!(target = "streak.cascade", role = %role, candidate = candidate.name, priority, nth, "control located");
				return Ok(ControlHandle {
					role,
					priority,
					candidate: candidate.name,
					query,
					nth,
				});
			}
			trace!(target = "streak.cascade", role = %role, candidate = candidate.name, "candidate missed");
		}

		debug!(target = "streak.cascade", role = %role, tried = candidates.len(), "cascade exhausted");
		Err(NotFound {
			role,
			tried: candidates.len(),
		})
	}

	/// All currently visible controls for `role`, across every candidate.
	///
	/// A single instantaneous pass: used for scanning signals such as
	/// challenge markers, where waiting on each candidate would stall.
	pub async fn locate_all(&self, role: Role, page: &dyn BrowserPage) -> Vec<ControlHandle> {
		let mut found = Vec::new();
		for (priority, candidate) in role.candidates().iter().enumerate() {
			let query = candidate.query();
			for nth in visible_indices(page, &query).await {
				found.push(ControlHandle {
					role,
					priority,
					candidate: candidate.name,
					query: query.clone(),
					nth,
				});
			}
		}
		found
	}

	/// Visible matches for `role` carrying `text`, summed over every candidate.
	///
	/// Instantaneous. Candidates may overlap, so the value is only meaningful
	/// when compared with another count taken the same way.
	pub async fn count_with_text(&self, role: Role, text: &str, page: &dyn BrowserPage) -> usize {
		let mut total = 0;
		for candidate in role.candidates() {
			total += visible_indices(page, &candidate.query_with_text(text)).await.len();
		}
		total
	}

	/// Polls until [`Self::count_with_text`] exceeds `baseline` or the
	/// visibility wait expires.
	pub async fn wait_for_new_with_text(&self, role: Role, text: &str, baseline: usize, page: &dyn BrowserPage) -> bool {
		let deadline = tokio::time::Instant::now() + self.visibility_timeout;
		loop {
			let count = self.count_with_text(role, text, page).await;
			if count > baseline {
				debug!(target = "streak.cascade", role = %role, baseline, count, "new text match appeared");
				return true;
			}
			if tokio::time::Instant::now() >= deadline {
				return false;
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}

	/// Polls until some match of `query` is visible or the wait expires.
	async fn wait_visible(&self, page: &dyn BrowserPage, query: &ElementQuery) -> Option<usize> {
		let deadline = tokio::time::Instant::now() + self.visibility_timeout;
		loop {
			if let Some(nth) = visible_indices(page, query).await.into_iter().next() {
				return Some(nth);
			}
			if tokio::time::Instant::now() >= deadline {
				return None;
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

async fn visible_indices(page: &dyn BrowserPage, query: &ElementQuery) -> Vec<usize> {
	let count = match page.count(query).await {
		Ok(count) => count,
		Err(err) => {
			trace!(target = "streak.cascade", query = %query, error = %err, "count failed");
			return Vec::new();
		}
	};

	let mut visible = Vec::new();
	for nth in 0..count {
		if page.is_visible(query, nth).await.unwrap_or(false) {
			visible.push(nth);
		}
	}
	visible
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_role_ends_in_broadest_candidate() {
		for role in [Role::OpenConversation, Role::ComposeInput] {
			let last = role.candidates().last().unwrap();
			assert!(!last.text.is_empty(), "{role} should end with a text-match fallback");
		}
	}

	#[test]
	fn candidate_names_are_unique_per_role() {
		for role in [Role::OpenConversation, Role::ComposeInput, Role::MessageBubble, Role::ChallengeMarker, Role::LoginPrompt] {
			let mut names: Vec<_> = role.candidates().iter().map(|c| c.name).collect();
			names.sort_unstable();
			names.dedup();
			assert_eq!(names.len(), role.candidates().len());
		}
	}

	#[test]
	fn text_candidate_builds_filtered_query() {
		let last = Role::ComposeInput.candidates().last().unwrap();
		let query = last.query();
		assert!(query.text.as_ref().is_some_and(|t| t.matches("Send a message...")));
	}

	#[test]
	fn runtime_text_replaces_static_matcher() {
		let bubble = &Role::MessageBubble.candidates()[0];
		let query = bubble.query_with_text("hello there");
		assert!(query.text.as_ref().is_some_and(|t| t.matches("HELLO THERE")));
	}
}
