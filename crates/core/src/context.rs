//! Per-run context threaded through the orchestrator and delivery machines.

use crate::config::EngineConfig;
use crate::page::BrowserPage;
use crate::pacing::PacingController;
use crate::selector::SelectorCascade;
use crate::snapshot::SnapshotSink;

/// Everything a run needs, constructed once and passed by reference.
///
/// The page is the run's single browsing surface; only the delivery machine
/// currently executing mutates it.
pub struct RunContext<'a> {
	pub page: &'a dyn BrowserPage,
	pub config: &'a EngineConfig,
	pub cascade: SelectorCascade,
	pub pacing: PacingController,
	pub snapshots: SnapshotSink,
}

impl<'a> RunContext<'a> {
	pub fn new(page: &'a dyn BrowserPage, config: &'a EngineConfig, snapshots: SnapshotSink) -> Self {
		Self {
			page,
			config,
			cascade: SelectorCascade::new(config.visibility_timeout(), config.poll_interval()),
			pacing: PacingController::new(config.pacing.clone()),
			snapshots,
		}
	}

	/// Replaces the pacing controller, e.g. with a seeded one.
	pub fn with_pacing(mut self, pacing: PacingController) -> Self {
		self.pacing = pacing;
		self
	}
}
