//! Session capture and inspection commands.
//!
//! - [`login`] - Interactive browser login with cookie capture
//! - [`show`] - Inspect a saved cookies file
//! - [`check`] - Probe whether a session still reaches the inbox

use std::path::Path;

use colored::Colorize;
use streak::{BrowserPage, Role, SelectorCascade};
use streak_protocol::StorageState;
use tracing::info;

use crate::browser::{ChromiumSession, LaunchOptions};
use crate::cli::{BrowserArgs, SessionArgs};
use crate::config;
use crate::error::{CliError, Result};

/// Opens a headed browser at the login page and saves its cookies.
///
/// The cookies are saved when the operator presses Enter or after
/// `timeout_secs` elapses, as a bare JSON cookie array suitable for
/// `TIKTOK_COOKIES` or `--cookies-file`.
///
/// # Errors
///
/// Returns an error if:
/// - Browser launch fails
/// - Navigation fails
/// - File I/O fails when saving the cookies
pub async fn login(output: &Path, timeout_secs: u64, config_path: Option<&Path>) -> Result<i32> {
	let engine = config::load_engine_config(config_path)?;
	let url = engine.platform.login_url();
	info!(target = "streak", %url, path = %output.display(), "starting interactive login");

	let browser = ChromiumSession::launch(LaunchOptions {
		headless: false,
		viewport: engine.platform.viewport,
	})
	.await?;
	match browser.page().goto(&url, engine.navigation_timeout()).await {
		Ok(()) => {}
		Err(err) if err.is_timeout() => info!(target = "streak", %url, "login page still loading"),
		Err(err) => return Err(err.into()),
	}

	println!("Browser opened at: {url}");
	println!();
	println!("Log in manually, then press Enter to save the session.");
	println!("(Or wait {timeout_secs} seconds for auto-save)");

	let stdin_future = tokio::task::spawn_blocking(|| {
		let mut input = String::new();
		std::io::stdin().read_line(&mut input).ok();
	});
	let timeout_future = tokio::time::sleep(std::time::Duration::from_secs(timeout_secs));

	tokio::select! {
		_ = stdin_future => println!("Saving session..."),
		_ = timeout_future => println!("\nTimeout reached, saving session..."),
	}

	let state = StorageState {
		cookies: browser.page().cookies().await?,
		origins: Vec::new(),
	};
	browser.close().await;

	if let Some(parent) = output.parent() {
		if !parent.as_os_str().is_empty() && !parent.exists() {
			std::fs::create_dir_all(parent)?;
		}
	}
	state.write_cookies(output).map_err(|e| CliError::Config(e.to_string()))?;

	println!();
	println!("Session saved to: {}", output.display());
	println!("  Cookies: {}", state.cookies.len());
	println!();
	println!("Use with: streak run --cookies-file {}", output.display());
	println!("or export its contents as TIKTOK_COOKIES.");
	Ok(0)
}

/// Displays the cookies in a saved session file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn show(file: &Path) -> Result<i32> {
	let state = StorageState::from_file(file).map_err(|e| CliError::Config(format!("Failed to load session file: {e}")))?;

	println!("Session from: {}", file.display());
	println!();

	println!("COOKIES ({}):", state.cookies.len());
	if state.cookies.is_empty() {
		println!("  (none)");
	} else {
		println!("  {:<24} {:<30} {:<12}", "NAME", "DOMAIN", "EXPIRES");
		println!("  {}", "-".repeat(66));
		for cookie in &state.cookies {
			let domain = cookie.domain.as_deref().unwrap_or("-");
			let expires = format_expiry(cookie.expires, unix_now());
			let expires = if expires == "expired" { expires.red().to_string() } else { expires };
			println!("  {:<24} {:<30} {:<12}", cookie.name, domain, expires);
		}
	}

	if !state.origins.is_empty() {
		println!();
		println!("LOCAL STORAGE ({} origins, not used by streak)", state.origins.len());
	}

	Ok(0)
}

/// Navigates to the inbox with the session and reports whether it is
/// still logged in. Exit 0 when valid, 1 otherwise.
pub async fn check(session_args: &SessionArgs, browser_args: &BrowserArgs) -> Result<i32> {
	let engine = config::load_engine_config(browser_args.config.as_deref())?;
	let session = config::load_session(session_args, &engine.platform)?;
	if session.looks_expired() {
		println!("{}", "Every dated cookie in the session has expired.".yellow());
	}

	let browser = ChromiumSession::launch(LaunchOptions {
		headless: !browser_args.headed,
		viewport: engine.platform.viewport,
	})
	.await?;
	let page = browser.page();

	let check_session = async {
		page.apply_session(&session).await?;
		let inbox = engine.platform.inbox_url();
		if let Err(err) = page.goto(&inbox, engine.navigation_timeout()).await {
			if !err.is_timeout() {
				return Err(err);
			}
		}
		let url = page.current_url().await?;
		let cascade = SelectorCascade::new(engine.visibility_timeout(), engine.poll_interval());
		let logged_out = engine.platform.is_login_url(&url) || !cascade.locate_all(Role::LoginPrompt, page).await.is_empty();
		Ok::<_, streak::EngineError>((url, logged_out))
	};
	let result = check_session.await;
	browser.close().await;

	let (url, logged_out) = result?;
	info!(target = "streak", %url, logged_out, "session check finished");
	if logged_out {
		println!("{} landed on {url}", "Session invalid:".red().bold());
		println!("Capture a new one with `streak auth login`.");
		Ok(1)
	} else {
		println!("{} reached {url}", "Session valid:".green().bold());
		Ok(0)
	}
}

fn unix_now() -> i64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs() as i64)
		.unwrap_or(0)
}

fn format_expiry(expires: Option<f64>, now: i64) -> String {
	let ts = match expires {
		None => return "session".into(),
		Some(ts) if ts < 0.0 => return "session".into(),
		Some(ts) => ts as i64,
	};

	if ts < now {
		return "expired".into();
	}

	let diff = ts - now;
	match diff {
		d if d < 3600 => format!("{}m", d / 60),
		d if d < 86400 => format!("{}h", d / 3600),
		d => format!("{}d", d / 86400),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const NOW: i64 = 1_700_000_000;

	#[test]
	fn expiry_formats() {
		assert_eq!(format_expiry(None, NOW), "session");
		assert_eq!(format_expiry(Some(-1.0), NOW), "session");
		assert_eq!(format_expiry(Some((NOW - 1) as f64), NOW), "expired");
		assert_eq!(format_expiry(Some((NOW + 600) as f64), NOW), "10m");
		assert_eq!(format_expiry(Some((NOW + 7200) as f64), NOW), "2h");
		assert_eq!(format_expiry(Some((NOW + 3 * 86400) as f64), NOW), "3d");
	}

	#[test]
	fn show_reads_cookie_array() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("cookies.json");
		std::fs::write(&path, r#"[{"name": "sessionid", "value": "x", "domain": ".platform.example"}]"#).unwrap();
		assert_eq!(show(&path).unwrap(), 0);
	}

	#[test]
	fn show_missing_file_is_config_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = show(&dir.path().join("absent.json")).unwrap_err();
		assert!(err.is_config());
	}
}
