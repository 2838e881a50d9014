//! Keep-alive message delivery over an authenticated browser session.
//!
//! The engine resolves each contact to a conversation endpoint, locates the
//! compose input through an ordered selector cascade, commits a fixed
//! message and classifies the result. It talks to the browser only through
//! the [`BrowserPage`] capability, so the same code runs against Chromium in
//! production and [`fake::FakePage`] in tests.
//!
//! # Layout
//!
//! * [`session`]: cookies and fingerprint for the run
//! * [`resolver`]: contact to conversation endpoint
//! * [`selector`]: per-role candidate lists and the cascade
//! * [`delivery`]: bounded per-contact state machine
//! * [`pacing`]: randomized delays
//! * [`orchestrator`]: sequential run and report

pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod fake;
pub mod orchestrator;
pub mod outcome;
pub mod pacing;
pub mod page;
pub mod report;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod snapshot;

pub use config::{DEFAULT_MESSAGE, EngineConfig, MAX_ATTEMPTS, PacingConfig, PlatformProfile, SecondsRange};
pub use context::RunContext;
pub use delivery::{Attempt, DeliveryMachine, DeliveryRecord, DeliveryState, FailureKind};
pub use error::{EngineError, Result};
pub use orchestrator::Orchestrator;
pub use outcome::{AttemptOutcome, SendConfidence};
pub use pacing::{PaceKind, PacingController};
pub use page::{BrowserPage, ElementQuery, Key, TextMatch};
pub use report::{FailedContact, HaltReason, RunReport};
pub use resolver::{Contact, Endpoint, ProfileSource, ResolveError, ResolvedTarget, TargetResolver};
pub use selector::{ControlHandle, Role, SelectorCandidate, SelectorCascade};
pub use session::{DEFAULT_USER_AGENT, SessionContext, SessionError};
pub use snapshot::SnapshotSink;
pub use streak_protocol as protocol;
