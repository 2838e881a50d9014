//! Per-contact attempt outcomes.

use serde::Serialize;

/// How much evidence backs a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendConfidence {
	/// The message text was observed echoed in the conversation.
	Confirmed,
	/// Composer located and committed, no block signal, no echo observed.
	Unconfirmed,
	/// Tab-cycle fallback; the keystrokes' target was never verified.
	Blind,
}

impl SendConfidence {
	pub fn is_verified(self) -> bool {
		matches!(self, SendConfidence::Confirmed)
	}
}

/// Tagged result of delivering to one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AttemptOutcome {
	Sent { confidence: SendConfidence },
	Blocked,
	NotFound,
	SessionInvalid,
	TransientFailure,
}

impl AttemptOutcome {
	pub fn is_sent(self) -> bool {
		matches!(self, AttemptOutcome::Sent { .. })
	}

	pub fn as_str(self) -> &'static str {
		match self {
			AttemptOutcome::Sent { .. } => "sent",
			AttemptOutcome::Blocked => "blocked",
			AttemptOutcome::NotFound => "not-found",
			AttemptOutcome::SessionInvalid => "session-invalid",
			AttemptOutcome::TransientFailure => "transient-failure",
		}
	}
}

impl std::fmt::Display for AttemptOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			AttemptOutcome::Sent { confidence } => write!(f, "sent ({confidence:?})"),
			other => f.write_str(other.as_str()),
		}
	}
}
