//! Sequential run over a contact list.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::context::RunContext;
use crate::delivery::{DeliveryMachine, DeliveryRecord};
use crate::outcome::AttemptOutcome;
use crate::pacing::PaceKind;
use crate::report::{HaltReason, RunReport};
use crate::resolver::Contact;
use crate::session::SessionContext;

/// Owns the session for the run's duration and drives one delivery machine
/// per contact, strictly in input order.
pub struct Orchestrator<'c, 'a> {
	ctx: &'c RunContext<'a>,
}

impl<'c, 'a> Orchestrator<'c, 'a> {
	pub fn new(ctx: &'c RunContext<'a>) -> Self {
		Self { ctx }
	}

	/// Delivers to every contact and returns the aggregate report.
	///
	/// Never fails: per-contact errors, including panics inside the browser
	/// adapter, become outcomes. A `SessionInvalid` outcome stops the loop and
	/// marks the remaining contacts as not attempted. Every input entry is
	/// accounted for; blank entries are recorded as `NotFound` without
	/// touching the page.
	pub async fn run<S: AsRef<str>>(&self, contacts: &[S], session: &SessionContext) -> RunReport {
		let mut report = RunReport::new(contacts.len());

		if contacts.is_empty() {
			info!(target = "streak.run", "no contacts given, nothing to do");
			report.emit();
			return report;
		}

		if session.looks_expired() {
			warn!(target = "streak.run", "every identity cookie with an expiry has expired; deliveries will likely hit the login page");
		}

		if let Err(err) = self.ctx.page.apply_session(session).await {
			error!(target = "streak.run", error = %err, "cannot apply session to browser");
			report.halt(HaltReason::SessionRejected { message: err.to_string() }, contacts.iter().map(|c| c.as_ref().to_string()));
			report.emit();
			return report;
		}

		info!(target = "streak.run", contacts = contacts.len(), "run started");
		for (index, raw) in contacts.iter().enumerate() {
			let Some(contact) = Contact::parse(raw.as_ref()) else {
				warn!(target = "streak.run", index, "blank contact entry");
				report.record(DeliveryRecord::without_attempts(raw.as_ref(), AttemptOutcome::NotFound));
				continue;
			};

			let record = self.deliver(&contact).await;
			info!(target = "streak.run", contact = %contact, outcome = %record.outcome, attempts = record.attempts, "contact done");

			let invalid = record.outcome == AttemptOutcome::SessionInvalid;
			report.record(record);
			if invalid {
				report.halt(
					HaltReason::SessionInvalid { contact: contact.to_string() },
					contacts[index + 1..].iter().map(|c| c.as_ref().to_string()),
				);
				break;
			}

			if index + 1 < contacts.len() {
				self.ctx.pacing.delay(PaceKind::InterContact).await;
			}
		}

		report.emit();
		report
	}

	async fn deliver(&self, contact: &Contact) -> DeliveryRecord {
		let machine = DeliveryMachine::new(self.ctx, contact.clone());
		match AssertUnwindSafe(machine.run()).catch_unwind().await {
			Ok(record) => record,
			Err(_) => {
				error!(target = "streak.run", contact = %contact, "delivery panicked");
				DeliveryRecord::without_attempts(contact.to_string(), AttemptOutcome::TransientFailure)
			}
		}
	}
}
