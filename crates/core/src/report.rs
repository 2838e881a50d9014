//! End-of-run aggregation.

use serde::Serialize;
use tracing::{info, warn};

use crate::delivery::DeliveryRecord;
use crate::outcome::AttemptOutcome;

/// Why a run stopped before reaching the end of the contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum HaltReason {
	/// The browser refused the session before any navigation.
	SessionRejected { message: String },
	/// A contact's delivery found the session logged out.
	SessionInvalid { contact: String },
}

impl std::fmt::Display for HaltReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			HaltReason::SessionRejected { message } => write!(f, "session rejected by browser: {message}"),
			HaltReason::SessionInvalid { contact } => write!(f, "session invalid while delivering to {contact}"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedContact {
	pub contact: String,
	pub outcome: AttemptOutcome,
}

/// Aggregate of a run, built incrementally and emitted once.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
	pub total: usize,
	pub attempted: usize,
	pub sent: usize,
	/// Sent without an observed echo (includes blind deliveries).
	pub unverified: usize,
	pub failed: Vec<FailedContact>,
	pub not_attempted: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub halted: Option<HaltReason>,
	pub records: Vec<DeliveryRecord>,
}

impl RunReport {
	pub fn new(total: usize) -> Self {
		Self { total, ..Self::default() }
	}

	pub fn record(&mut self, record: DeliveryRecord) {
		self.attempted += 1;
		match record.outcome {
			AttemptOutcome::Sent { confidence } => {
				self.sent += 1;
				if !confidence.is_verified() {
					self.unverified += 1;
				}
			}
			outcome => self.failed.push(FailedContact {
				contact: record.contact.clone(),
				outcome,
			}),
		}
		self.records.push(record);
	}

	/// Marks every remaining contact as not attempted and records why.
	pub fn halt<I, S>(&mut self, reason: HaltReason, remaining: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.not_attempted.extend(remaining.into_iter().map(Into::into));
		self.halted = Some(reason);
	}

	/// Every input contact is accounted for exactly once.
	pub fn is_complete(&self) -> bool {
		self.attempted + self.not_attempted.len() == self.total
	}

	pub fn failed_count(&self) -> usize {
		self.failed.len()
	}

	/// Logs the summary through `tracing`.
	pub fn emit(&self) {
		info!(
			target = "streak.run",
			total = self.total,
			attempted = self.attempted,
			sent = self.sent,
			unverified = self.unverified,
			failed = self.failed.len(),
			not_attempted = self.not_attempted.len(),
			"run finished"
		);
		for failed in &self.failed {
			warn!(target = "streak.run", contact = %failed.contact, outcome = %failed.outcome, "delivery failed");
		}
		if let Some(reason) = &self.halted {
			warn!(target = "streak.run", %reason, skipped = ?self.not_attempted, "run halted early");
		}
	}
}
