//! Loading contacts, session cookies and engine tuning.
//!
//! Everything here runs before a browser is launched, so every failure is a
//! configuration error.

use std::path::Path;

use anyhow::Context;
use streak::{EngineConfig, PlatformProfile, SessionContext};
use tracing::{debug, info, warn};

use crate::cli::SessionArgs;
use crate::error::{CliError, Result};

/// Splits a comma- or line-delimited contact list.
///
/// Order and duplicates are preserved; blank entries are dropped.
pub fn parse_contacts(raw: &str) -> Vec<String> {
	raw.split([',', '\n'])
		.map(str::trim)
		.filter(|c| !c.is_empty())
		.map(str::to_string)
		.collect()
}

/// Contacts from the inline value, else from `file` when it exists.
pub fn load_contacts(inline: Option<&str>, file: &Path) -> Result<Vec<String>> {
	if let Some(raw) = inline.filter(|r| !r.trim().is_empty()) {
		let contacts = parse_contacts(raw);
		info!(target = "streak", count = contacts.len(), "contacts loaded from --contacts/FRIENDS_LIST");
		return Ok(contacts);
	}

	if !file.exists() {
		warn!(target = "streak", path = %file.display(), "no contacts given and contact file not found");
		return Ok(Vec::new());
	}

	let raw = std::fs::read_to_string(file).with_context(|| format!("reading contact file {}", file.display()))?;
	let contacts = parse_contacts(&raw);
	info!(target = "streak", count = contacts.len(), path = %file.display(), "contacts loaded from file");
	Ok(contacts)
}

/// Session cookies from the inline JSON or the cookies file, with the
/// platform's fingerprint applied.
pub fn load_session(args: &SessionArgs, platform: &PlatformProfile) -> Result<SessionContext> {
	let session = match (&args.cookies, &args.cookies_file) {
		(Some(raw), _) if !raw.trim().is_empty() => SessionContext::from_json(raw)?,
		(_, Some(path)) => {
			let raw = std::fs::read_to_string(path).with_context(|| format!("reading cookies file {}", path.display()))?;
			SessionContext::from_json(&raw)?
		}
		_ => {
			return Err(CliError::Config(
				"no session cookies: set TIKTOK_COOKIES, pass --cookies or --cookies-file (see `streak auth login`)".into(),
			));
		}
	};

	debug!(target = "streak", cookies = session.cookies().len(), "session loaded");
	Ok(session.with_user_agent(platform.user_agent.clone()).with_viewport(platform.viewport))
}

/// Engine configuration from an optional JSON file; defaults otherwise.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
	let Some(path) = path else {
		return Ok(EngineConfig::default());
	};
	let raw = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
	let config: EngineConfig = serde_json::from_str(&raw)?;
	if config.message.trim().is_empty() {
		return Err(CliError::Config(format!("{}: message must not be empty", path.display())));
	}
	config.pacing.validate().map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
	Ok(config)
}
