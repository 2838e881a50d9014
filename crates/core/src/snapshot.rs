//! Diagnostic page snapshots for ambiguous failures.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::page::BrowserPage;

/// Writes full-page screenshots keyed by contact and attempt.
///
/// Capture failures are logged and swallowed; snapshots are a debugging aid
/// and never change an outcome.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSink {
	dir: Option<PathBuf>,
}

impl SnapshotSink {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: Some(dir.into()) }
	}

	pub fn disabled() -> Self {
		Self { dir: None }
	}

	pub fn dir(&self) -> Option<&Path> {
		self.dir.as_deref()
	}

	/// Target path for a snapshot, or `None` when capture is disabled.
	pub fn path_for(&self, contact: &str, attempt: u8, reason: &str) -> Option<PathBuf> {
		let dir = self.dir.as_ref()?;
		Some(dir.join(format!("{}_attempt{}_{}.png", sanitize(contact), attempt, sanitize(reason))))
	}

	pub async fn capture(&self, page: &dyn BrowserPage, contact: &str, attempt: u8, reason: &str) -> Option<PathBuf> {
		let path = self.path_for(contact, attempt, reason)?;
		if let Some(parent) = path.parent() {
			if let Err(err) = std::fs::create_dir_all(parent) {
				warn!(target = "streak.snapshot", dir = %parent.display(), error = %err, "cannot create snapshot dir");
				return None;
			}
		}

		match page.screenshot(&path).await {
			Ok(()) => {
				info!(target = "streak.snapshot", %contact, attempt, %reason, path = %path.display(), "snapshot saved");
				Some(path)
			}
			Err(err) => {
				warn!(target = "streak.snapshot", %contact, attempt, %reason, error = %err, "snapshot failed");
				None
			}
		}
	}
}

fn sanitize(raw: &str) -> String {
	let cleaned: String = raw
		.trim_start_matches("https://")
		.trim_start_matches("http://")
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
		.collect();
	cleaned.trim_matches('_').to_string()
}
