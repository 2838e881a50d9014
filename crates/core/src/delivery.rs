//! Per-contact delivery state machine.
//!
//! ```text
//! Idle -> TargetResolving -> ComposerOpening -> MessageTyping -> Verifying -> Sent
//!              ^                                                       |
//!              +---------------- Retrying <--- (transient fault) ------+--> Failed(kind)
//! ```
//!
//! The attempt index lives in the state, so retry exhaustion and outcome
//! classification are properties of [`DeliveryState`] rather than of a loop
//! counter. The page is checked for logout and challenge signals at every
//! transition boundary; a logout short-circuits without consuming retries.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MAX_ATTEMPTS;
use crate::context::RunContext;
use crate::error::EngineError;
use crate::outcome::{AttemptOutcome, SendConfidence};
use crate::page::Key;
use crate::pacing::PaceKind;
use crate::resolver::{Contact, Endpoint, ProfileSource, ResolveError, ResolvedTarget, TargetResolver};
use crate::selector::{ControlHandle, Role};

/// Words in a page title that mark a bot-mitigation screen.
const CHALLENGE_TITLES: &[&str] = &["captcha", "verify", "verification", "security check", "just a moment", "access denied"];

/// One-based attempt index, bounded by [`MAX_ATTEMPTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempt(u8);

impl Attempt {
	pub const FIRST: Attempt = Attempt(1);

	pub fn number(self) -> u8 {
		self.0
	}

	/// The following attempt, or `None` once the bound is reached.
	pub fn next(self) -> Option<Attempt> {
		(self.0 < MAX_ATTEMPTS).then_some(Attempt(self.0 + 1))
	}
}

/// Terminal failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
	Blocked,
	NotFound,
	SessionInvalid,
	TransientFailure,
}

impl From<FailureKind> for AttemptOutcome {
	fn from(kind: FailureKind) -> Self {
		match kind {
			FailureKind::Blocked => AttemptOutcome::Blocked,
			FailureKind::NotFound => AttemptOutcome::NotFound,
			FailureKind::SessionInvalid => AttemptOutcome::SessionInvalid,
			FailureKind::TransientFailure => AttemptOutcome::TransientFailure,
		}
	}
}

/// Why a step could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
	/// Automation error with the attempt otherwise salvageable.
	Transient,
	NotFound,
	Blocked,
	SessionInvalid,
}

/// Page-level signal observed at a transition boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
	LoggedOut,
	Challenge,
}

impl From<PageSignal> for Fault {
	fn from(signal: PageSignal) -> Self {
		match signal {
			PageSignal::LoggedOut => Fault::SessionInvalid,
			PageSignal::Challenge => Fault::Blocked,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryState {
	Idle,
	TargetResolving { attempt: Attempt },
	ComposerOpening { attempt: Attempt, target: Box<ResolvedTarget> },
	/// `composer` is `None` when the cascade found nothing and the blind
	/// keystroke fallback is about to run.
	MessageTyping { attempt: Attempt, composer: Option<ControlHandle> },
	/// `echoes_before` counts bubbles already showing the message before the
	/// commit; only a bubble beyond that count confirms the send.
	Verifying {
		attempt: Attempt,
		confidence: SendConfidence,
		echoes_before: usize,
	},
	/// A transient fault ended `attempt`; the page is reloaded before the next.
	Retrying { attempt: Attempt },
	Sent { confidence: SendConfidence },
	Failed(FailureKind),
}

impl DeliveryState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, DeliveryState::Sent { .. } | DeliveryState::Failed(_))
	}

	/// State following a fault during `attempt`.
	pub fn after_fault(attempt: Attempt, fault: Fault) -> DeliveryState {
		match fault {
			Fault::SessionInvalid => DeliveryState::Failed(FailureKind::SessionInvalid),
			Fault::Blocked => DeliveryState::Failed(FailureKind::Blocked),
			Fault::NotFound => DeliveryState::Failed(FailureKind::NotFound),
			Fault::Transient => match attempt.next() {
				Some(_) => DeliveryState::Retrying { attempt },
				None => DeliveryState::Failed(FailureKind::TransientFailure),
			},
		}
	}

	/// Outcome of a terminal state.
	pub fn outcome(&self) -> Option<AttemptOutcome> {
		match self {
			DeliveryState::Sent { confidence } => Some(AttemptOutcome::Sent { confidence: *confidence }),
			DeliveryState::Failed(kind) => Some((*kind).into()),
			_ => None,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			DeliveryState::Idle => "idle",
			DeliveryState::TargetResolving { .. } => "target-resolving",
			DeliveryState::ComposerOpening { .. } => "composer-opening",
			DeliveryState::MessageTyping { .. } => "message-typing",
			DeliveryState::Verifying { .. } => "verifying",
			DeliveryState::Retrying { .. } => "retrying",
			DeliveryState::Sent { .. } => "sent",
			DeliveryState::Failed(_) => "failed",
		}
	}
}

/// Outcome of one contact's delivery, with what it took to get there.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
	pub contact: String,
	pub outcome: AttemptOutcome,
	pub attempts: u8,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolved_via: Option<&'static str>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub snapshots: Vec<PathBuf>,
}

impl DeliveryRecord {
	/// Record for a contact whose outcome was decided without a completed attempt.
	pub fn without_attempts(contact: impl Into<String>, outcome: AttemptOutcome) -> Self {
		Self {
			contact: contact.into(),
			outcome,
			attempts: 0,
			resolved_via: None,
			snapshots: Vec::new(),
		}
	}
}

/// Drives one contact from `Idle` to a terminal state.
pub struct DeliveryMachine<'c, 'a> {
	ctx: &'c RunContext<'a>,
	contact: Contact,
	state: DeliveryState,
	attempts: u8,
	resolved_via: Option<&'static str>,
	snapshots: Vec<PathBuf>,
}

impl<'c, 'a> DeliveryMachine<'c, 'a> {
	pub fn new(ctx: &'c RunContext<'a>, contact: Contact) -> Self {
		Self {
			ctx,
			contact,
			state: DeliveryState::Idle,
			attempts: 0,
			resolved_via: None,
			snapshots: Vec::new(),
		}
	}

	pub fn state(&self) -> &DeliveryState {
		&self.state
	}

	/// Runs transitions until a terminal state is reached.
	pub async fn run(mut self) -> DeliveryRecord {
		while !self.state.is_terminal() {
			self.step().await;
		}

		let outcome = self.state.outcome().unwrap_or(AttemptOutcome::TransientFailure);
		DeliveryRecord {
			contact: self.contact.to_string(),
			outcome,
			attempts: self.attempts,
			resolved_via: self.resolved_via,
			snapshots: self.snapshots,
		}
	}

	/// Performs exactly one transition.
	pub async fn step(&mut self) {
		let state = std::mem::replace(&mut self.state, DeliveryState::Idle);
		let from = state.name();
		let next = match state {
			DeliveryState::Idle => DeliveryState::TargetResolving { attempt: Attempt::FIRST },
			DeliveryState::TargetResolving { attempt } => self.resolve_target(attempt).await,
			DeliveryState::ComposerOpening { attempt, target } => self.open_composer(attempt, *target).await,
			DeliveryState::MessageTyping { attempt, composer } => self.type_message(attempt, composer).await,
			DeliveryState::Verifying {
				attempt,
				confidence,
				echoes_before,
			} => self.verify(attempt, confidence, echoes_before).await,
			DeliveryState::Retrying { attempt } => self.recover(attempt).await,
			terminal @ (DeliveryState::Sent { .. } | DeliveryState::Failed(_)) => terminal,
		};
		debug!(target = "streak.delivery", contact = %self.contact, from, to = next.name(), "transition");
		self.state = next;
	}

	async fn resolve_target(&mut self, attempt: Attempt) -> DeliveryState {
		self.attempts = attempt.number();
		info!(target = "streak.delivery", contact = %self.contact, attempt = attempt.number(), max = MAX_ATTEMPTS, "attempt started");

		let resolver = TargetResolver::new(&self.ctx.config.platform, &self.ctx.cascade, self.ctx.config.navigation_timeout());
		let resolved = resolver.resolve(&self.contact, self.ctx.page).await;

		if let Some(signal) = self.page_signal().await {
			return self.fail_with_signal(attempt, signal).await;
		}

		match resolved {
			Ok(target) => {
				self.resolved_via = Some(match (&target.source, &target.endpoint) {
					(ProfileSource::DirectReference, Endpoint::Conversation { .. }) => "direct-reference+account-id",
					(ProfileSource::DirectReference, Endpoint::Control(_)) => "direct-reference+ui",
					(ProfileSource::SynthesizedProfile, Endpoint::Conversation { .. }) => "synthesized-profile+account-id",
					(ProfileSource::SynthesizedProfile, Endpoint::Control(_)) => "synthesized-profile+ui",
				});
				DeliveryState::ComposerOpening {
					attempt,
					target: Box::new(target),
				}
			}
			Err(ResolveError::NotFound { .. }) => {
				warn!(target = "streak.delivery", contact = %self.contact, "no conversation endpoint found");
				self.snapshot(attempt, "target-not-found").await;
				DeliveryState::after_fault(attempt, Fault::NotFound)
			}
			Err(ResolveError::Engine(err)) => self.transient(attempt, "resolve", &err),
		}
	}

	async fn open_composer(&mut self, attempt: Attempt, target: ResolvedTarget) -> DeliveryState {
		let page = self.ctx.page;
		match &target.endpoint {
			Endpoint::Conversation { url, .. } => match page.goto(url, self.ctx.config.navigation_timeout()).await {
				Ok(()) => {}
				Err(err) if err.is_timeout() => {
					warn!(target = "streak.delivery", contact = %self.contact, %url, error = %err, "conversation load timed out, continuing");
				}
				Err(err) => return self.transient(attempt, "open conversation", &err),
			},
			Endpoint::Control(handle) => {
				self.ctx.pacing.delay(PaceKind::PreAction).await;
				if let Err(err) = handle.click(page).await {
					return self.transient(attempt, "click conversation control", &err);
				}
			}
		}

		if let Some(signal) = self.page_signal().await {
			return self.fail_with_signal(attempt, signal).await;
		}

		match self.ctx.cascade.locate(Role::ComposeInput, page).await {
			Ok(composer) => DeliveryState::MessageTyping {
				attempt,
				composer: Some(composer),
			},
			Err(err) => {
				warn!(target = "streak.delivery", contact = %self.contact, error = %err, "composer not found, falling back to blind keystrokes");
				self.snapshot(attempt, "composer-not-found").await;
				DeliveryState::MessageTyping { attempt, composer: None }
			}
		}
	}

	async fn type_message(&mut self, attempt: Attempt, composer: Option<ControlHandle>) -> DeliveryState {
		let page = self.ctx.page;
		let message = self.ctx.config.message.as_str();
		self.ctx.pacing.delay(PaceKind::PreAction).await;

		let echoes_before = if composer.is_some() {
			self.ctx.cascade.count_with_text(Role::MessageBubble, message, page).await
		} else {
			0
		};
		let committed = match &composer {
			Some(handle) => {
				debug!(target = "streak.delivery", contact = %self.contact, candidate = handle.candidate, "typing into composer");
				match handle.fill(page, message).await {
					Ok(()) => page.press(Key::Enter).await,
					Err(err) => Err(err),
				}
			}
			None => self.blind_keystrokes(message).await,
		};

		if let Err(err) = committed {
			if let Some(signal) = self.page_signal().await {
				return self.fail_with_signal(attempt, signal).await;
			}
			return self.transient(attempt, "commit message", &err);
		}

		let confidence = if composer.is_some() { SendConfidence::Unconfirmed } else { SendConfidence::Blind };
		DeliveryState::Verifying {
			attempt,
			confidence,
			echoes_before,
		}
	}

	async fn blind_keystrokes(&self, message: &str) -> Result<(), EngineError> {
		let page = self.ctx.page;
		for _ in 0..self.ctx.config.blind_tab_presses {
			page.press(Key::Tab).await?;
		}
		page.type_text(message).await?;
		page.press(Key::Enter).await
	}

	async fn verify(&mut self, attempt: Attempt, confidence: SendConfidence, echoes_before: usize) -> DeliveryState {
		if let Some(signal) = self.page_signal().await {
			return self.fail_with_signal(attempt, signal).await;
		}

		let confidence = match confidence {
			SendConfidence::Unconfirmed => {
				let echoed = self
					.ctx
					.cascade
					.wait_for_new_with_text(Role::MessageBubble, &self.ctx.config.message, echoes_before, self.ctx.page)
					.await;
				if echoed { SendConfidence::Confirmed } else { SendConfidence::Unconfirmed }
			}
			other => other,
		};

		info!(target = "streak.delivery", contact = %self.contact, attempt = attempt.number(), ?confidence, "message sent");
		DeliveryState::Sent { confidence }
	}

	async fn recover(&mut self, attempt: Attempt) -> DeliveryState {
		let Some(next) = attempt.next() else {
			return DeliveryState::Failed(FailureKind::TransientFailure);
		};

		if let Err(err) = self.ctx.page.reload(self.ctx.config.navigation_timeout()).await {
			warn!(target = "streak.delivery", contact = %self.contact, error = %err, "reload failed before retry");
		}
		self.ctx.pacing.delay(PaceKind::PostReload).await;
		DeliveryState::TargetResolving { attempt: next }
	}

	fn transient(&self, attempt: Attempt, step: &str, err: &EngineError) -> DeliveryState {
		warn!(
			target = "streak.delivery",
			contact = %self.contact,
			attempt = attempt.number(),
			max = MAX_ATTEMPTS,
			step,
			error = %err,
			"attempt failed"
		);
		DeliveryState::after_fault(attempt, Fault::Transient)
	}

	async fn fail_with_signal(&mut self, attempt: Attempt, signal: PageSignal) -> DeliveryState {
		let reason = match signal {
			PageSignal::LoggedOut => {
				warn!(target = "streak.delivery", contact = %self.contact, "page shows the authentication entry point");
				"logged-out"
			}
			PageSignal::Challenge => {
				warn!(target = "streak.delivery", contact = %self.contact, "page shows a verification challenge");
				"blocked"
			}
		};
		self.snapshot(attempt, reason).await;
		DeliveryState::after_fault(attempt, signal.into())
	}

	/// Logout or challenge signal on the current page, if any.
	async fn page_signal(&self) -> Option<PageSignal> {
		let page = self.ctx.page;
		let platform = &self.ctx.config.platform;

		if page.current_url().await.is_ok_and(|url| platform.is_login_url(&url)) {
			return Some(PageSignal::LoggedOut);
		}
		if !self.ctx.cascade.locate_all(Role::LoginPrompt, page).await.is_empty() {
			return Some(PageSignal::LoggedOut);
		}

		let title = page.title().await.unwrap_or_default().to_lowercase();
		if CHALLENGE_TITLES.iter().any(|marker| title.contains(marker)) {
			return Some(PageSignal::Challenge);
		}
		if !self.ctx.cascade.locate_all(Role::ChallengeMarker, page).await.is_empty() {
			return Some(PageSignal::Challenge);
		}
		None
	}

	async fn snapshot(&mut self, attempt: Attempt, reason: &str) {
		if let Some(path) = self.ctx.snapshots.capture(self.ctx.page, self.contact.as_str(), attempt.number(), reason).await {
			self.snapshots.push(path);
		}
	}
}
