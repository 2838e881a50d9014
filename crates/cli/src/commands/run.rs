use colored::Colorize;
use streak::{Orchestrator, RunContext, RunReport, SnapshotSink};
use tracing::{info, warn};

use crate::browser::{ChromiumSession, LaunchOptions};
use crate::cli::RunArgs;
use crate::config;
use crate::error::Result;

/// Loads configuration, then delivers to every contact.
///
/// Exits 0 whenever the run completes, whatever the per-contact outcomes.
/// Configuration problems surface as errors before any browser starts.
pub async fn execute(args: RunArgs) -> Result<i32> {
	let mut engine = config::load_engine_config(args.browser.config.as_deref())?;
	if let Some(message) = args.message {
		engine.message = message;
	}

	let contacts = config::load_contacts(args.contacts.as_deref(), &args.contacts_file)?;
	if contacts.is_empty() {
		warn!(target = "streak", "contact list is empty, nothing to send");
		return Ok(0);
	}
	let session = config::load_session(&args.session, &engine.platform)?;

	let snapshots = if args.no_artifacts {
		SnapshotSink::disabled()
	} else {
		SnapshotSink::new(args.artifacts_dir)
	};

	info!(target = "streak", contacts = contacts.len(), headless = !args.browser.headed, "starting run");
	let browser = ChromiumSession::launch(LaunchOptions {
		headless: !args.browser.headed,
		viewport: engine.platform.viewport,
	})
	.await?;

	let report = {
		let ctx = RunContext::new(browser.page(), &engine, snapshots);
		Orchestrator::new(&ctx).run(contacts.as_slice(), &session).await
	};
	browser.close().await;

	print_summary(&report);
	Ok(0)
}

fn print_summary(report: &RunReport) {
	println!();
	println!(
		"{} {}/{} sent, {} failed, {} not attempted",
		"Run summary:".bold(),
		report.sent,
		report.total,
		report.failed_count(),
		report.not_attempted.len()
	);

	for record in &report.records {
		let line = format!("{:<32} {}", record.contact, record.outcome);
		let line = match record.outcome {
			streak::AttemptOutcome::Sent { confidence } if confidence.is_verified() => line.green(),
			streak::AttemptOutcome::Sent { .. } => line.yellow(),
			_ => line.red(),
		};
		println!("  {line}");
	}
	for contact in &report.not_attempted {
		println!("  {}", format!("{contact:<32} not attempted").dimmed());
	}

	if report.unverified > 0 {
		println!();
		println!("{} sends were not confirmed by an echo in the conversation.", report.unverified);
	}
	if let Some(reason) = &report.halted {
		println!();
		println!("{} {reason}", "Run halted:".red().bold());
		println!("Refresh the session with `streak auth login` and update TIKTOK_COOKIES.");
	}
}
