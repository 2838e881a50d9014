//! End-to-end runs against the scripted page.
//!
//! Time is paused so visibility waits and pacing delays complete instantly.

use streak::fake::{ECHO_CSS, FakeCall, FakeElement, FakePage, FakeRoute};
use streak::{
	AttemptOutcome, DEFAULT_MESSAGE, EngineConfig, HaltReason, Key, Orchestrator, PlatformProfile, RunContext, SendConfidence, SessionContext, SnapshotSink,
};

const BASE: &str = "https://platform.example";
const SESSION: &str = r#"[{"name": "sessionid", "value": "abc", "domain": ".platform.example", "path": "/"}]"#;
const EXPIRED_SESSION: &str = r#"[{"name": "sessionid", "value": "abc", "domain": ".platform.example", "path": "/", "expires": 100.0}]"#;

const COMPOSER: &str = r#"div[contenteditable="true"][role="textbox"]"#;
const PROFILE_MESSAGE_BUTTON: &str = r#"[data-e2e="user-message"]"#;

fn config() -> EngineConfig {
	EngineConfig {
		platform: PlatformProfile::with_base_url(BASE),
		..EngineConfig::default()
	}
}

fn session() -> SessionContext {
	SessionContext::from_json(SESSION).unwrap()
}

fn profile_with_id(handle: &str, id: &str) -> FakeRoute {
	FakeRoute::new(format!("{BASE}/@{handle}")).html(format!(r#"<script>{{"userInfo":{{"user":{{"id":"{id}","uniqueId":"{handle}"}}}}}}</script>"#))
}

fn inbox() -> FakeRoute {
	FakeRoute::new(format!("{BASE}/messages")).element(FakeElement::new(COMPOSER, "")).echo_sent()
}

#[tokio::test(start_paused = true)]
async fn handle_and_url_contacts_resolve_via_their_strategies() {
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox()).route(
		FakeRoute::new(format!("{BASE}/@bob")).element(FakeElement::new(PROFILE_MESSAGE_BUTTON, "Message").navigates_to(format!("{BASE}/messages?u=bob"))),
	);
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice", "https://platform.example/@bob"], &session()).await;

	assert_eq!(report.attempted, 2);
	assert_eq!(report.sent, 2);
	assert!(report.is_complete());
	assert_eq!(report.records[0].resolved_via, Some("synthesized-profile+account-id"));
	assert_eq!(report.records[1].resolved_via, Some("direct-reference+ui"));
	assert!(
		page.calls()
			.contains(&FakeCall::Goto(format!("{BASE}/messages?lang=en&u=6800000000000000001")))
	);
	assert!(page.calls().contains(&FakeCall::Goto(format!("{BASE}/@alice"))));
	assert_eq!(page.sent(), vec![DEFAULT_MESSAGE.to_string(), DEFAULT_MESSAGE.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn echoed_message_is_confirmed() {
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox());
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice"], &session()).await;

	assert_eq!(
		report.records[0].outcome,
		AttemptOutcome::Sent {
			confidence: SendConfidence::Confirmed
		}
	);
	assert_eq!(report.unverified, 0);
}

#[tokio::test(start_paused = true)]
async fn missing_echo_leaves_send_unconfirmed() {
	let inbox = FakeRoute::new(format!("{BASE}/messages")).element(FakeElement::new(COMPOSER, ""));
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox);
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice"], &session()).await;

	assert_eq!(
		report.records[0].outcome,
		AttemptOutcome::Sent {
			confidence: SendConfidence::Unconfirmed
		}
	);
	assert_eq!(report.sent, 1);
	assert_eq!(report.unverified, 1);
}

#[tokio::test(start_paused = true)]
async fn earlier_copy_of_message_does_not_confirm_send() {
	let inbox = FakeRoute::new(format!("{BASE}/messages"))
		.element(FakeElement::new(COMPOSER, ""))
		.element(FakeElement::new(ECHO_CSS, DEFAULT_MESSAGE));
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox);
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice"], &session()).await;

	assert_eq!(
		report.records[0].outcome,
		AttemptOutcome::Sent {
			confidence: SendConfidence::Unconfirmed
		}
	);
	assert_eq!(report.unverified, 1);
}

#[tokio::test(start_paused = true)]
async fn new_echo_next_to_earlier_copy_confirms_send() {
	let inbox = FakeRoute::new(format!("{BASE}/messages"))
		.element(FakeElement::new(COMPOSER, ""))
		.element(FakeElement::new(ECHO_CSS, DEFAULT_MESSAGE))
		.echo_sent();
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox);
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice"], &session()).await;

	assert_eq!(
		report.records[0].outcome,
		AttemptOutcome::Sent {
			confidence: SendConfidence::Confirmed
		}
	);
	assert_eq!(report.unverified, 0);
}

#[tokio::test(start_paused = true)]
async fn expired_identity_halts_run_without_failing_the_rest() {
	let page = FakePage::new().route(FakeRoute::new(format!("{BASE}/@")).redirect_to(format!("{BASE}/login?redirect_url=%2F")));
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());
	let session = SessionContext::from_json(EXPIRED_SESSION).unwrap();

	let report = Orchestrator::new(&ctx).run(&["alice", "bob", "carol"], &session).await;

	assert_eq!(report.sent, 0);
	assert_eq!(report.attempted, 1);
	assert_eq!(report.records[0].outcome, AttemptOutcome::SessionInvalid);
	assert_eq!(report.records[0].attempts, 1);
	assert_eq!(report.not_attempted, vec!["bob".to_string(), "carol".to_string()]);
	assert_eq!(report.halted, Some(HaltReason::SessionInvalid { contact: "alice".into() }));
	assert!(report.failed.iter().all(|f| f.contact == "alice"));
	assert!(report.is_complete());
	assert_eq!(page.goto_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn login_prompt_on_profile_is_session_invalid() {
	let page = FakePage::new().route(FakeRoute::new(format!("{BASE}/@alice")).element(FakeElement::new(r#"[data-e2e="top-login-button"]"#, "Log in")));
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice", "bob"], &session()).await;

	assert_eq!(report.records[0].outcome, AttemptOutcome::SessionInvalid);
	assert_eq!(report.not_attempted, vec!["bob".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn last_resort_composer_still_delivers() {
	let fallback_css = r#"[contenteditable], [role="textbox"], input[type="text"]"#;
	let inbox = FakeRoute::new(format!("{BASE}/messages")).element(FakeElement::new(fallback_css, "Send a message..."));
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox);
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice"], &session()).await;

	assert!(report.records[0].outcome.is_sent());
	assert_eq!(page.sent(), vec![DEFAULT_MESSAGE.to_string()]);
	assert!(page.calls().iter().any(|c| matches!(c, FakeCall::Fill(css, 0, _) if css == fallback_css)));
}

#[tokio::test(start_paused = true)]
async fn unknown_composer_falls_back_to_blind_keystrokes() {
	let dir = tempfile::tempdir().unwrap();
	let page = FakePage::new()
		.route(profile_with_id("alice", "6800000000000000001"))
		.route(FakeRoute::new(format!("{BASE}/messages")));
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::new(dir.path()));

	let report = Orchestrator::new(&ctx).run(&["alice"], &session()).await;
	let record = &report.records[0];

	assert_eq!(
		record.outcome,
		AttemptOutcome::Sent {
			confidence: SendConfidence::Blind
		}
	);
	assert_eq!(report.unverified, 1);
	assert_eq!(page.sent(), vec![DEFAULT_MESSAGE.to_string()]);
	let tabs = page.calls().iter().filter(|c| **c == FakeCall::Press(Key::Tab)).count();
	assert_eq!(tabs, config.blind_tab_presses as usize);
	assert_eq!(record.snapshots, vec![dir.path().join("alice_attempt1_composer-not-found.png")]);
	assert!(record.snapshots[0].exists());
}

#[tokio::test(start_paused = true)]
async fn every_attempt_failing_stops_at_three() {
	let page = FakePage::new().route(FakeRoute::new(format!("{BASE}/@dave")).goto_fails());
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["dave"], &session()).await;

	assert_eq!(report.records[0].outcome, AttemptOutcome::TransientFailure);
	assert_eq!(report.records[0].attempts, 3);
	assert_eq!(page.goto_count(), 3);
	assert_eq!(page.calls().iter().filter(|c| **c == FakeCall::Reload).count(), 2);
}

#[tokio::test(start_paused = true)]
async fn detached_composer_is_retried_then_recorded() {
	let inbox = FakeRoute::new(format!("{BASE}/messages")).element(FakeElement::new(COMPOSER, "")).detached_actions();
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox);
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice", "bob"], &session()).await;

	assert_eq!(report.records[0].outcome, AttemptOutcome::TransientFailure);
	assert_eq!(report.records[0].attempts, 3);
	assert_eq!(report.attempted, 2);
	assert!(page.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn profile_timeout_is_soft() {
	let page = FakePage::new()
		.route(profile_with_id("alice", "6800000000000000001").goto_times_out())
		.route(inbox());
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice"], &session()).await;

	assert!(report.records[0].outcome.is_sent());
	assert_eq!(report.records[0].attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn challenge_is_blocked_and_run_continues() {
	let dir = tempfile::tempdir().unwrap();
	let page = FakePage::new()
		.route(FakeRoute::new(format!("{BASE}/@eve")).title("Security Check"))
		.route(profile_with_id("alice", "6800000000000000001"))
		.route(inbox());
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::new(dir.path()));

	let report = Orchestrator::new(&ctx).run(&["eve", "alice"], &session()).await;

	assert_eq!(report.records[0].outcome, AttemptOutcome::Blocked);
	assert_eq!(report.records[0].attempts, 1);
	assert_eq!(report.records[0].snapshots, vec![dir.path().join("eve_attempt1_blocked.png")]);
	assert!(report.records[1].outcome.is_sent());
	assert!(report.halted.is_none());
}

#[tokio::test(start_paused = true)]
async fn unresolvable_contact_is_not_found() {
	let dir = tempfile::tempdir().unwrap();
	let page = FakePage::new().route(FakeRoute::new(format!("{BASE}/@ghost")).title("ghost on Platform"));
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::new(dir.path()));

	let report = Orchestrator::new(&ctx).run(&["ghost"], &session()).await;

	assert_eq!(report.records[0].outcome, AttemptOutcome::NotFound);
	assert_eq!(report.records[0].attempts, 1);
	assert_eq!(page.goto_count(), 1);
	assert!(dir.path().join("ghost_attempt1_target-not-found.png").exists());
}

#[tokio::test(start_paused = true)]
async fn rejected_session_attempts_nothing() {
	let page = FakePage::new().rejecting_session();
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice", "bob"], &session()).await;

	assert_eq!(report.attempted, 0);
	assert_eq!(report.not_attempted.len(), 2);
	assert!(matches!(report.halted, Some(HaltReason::SessionRejected { .. })));
	assert_eq!(page.goto_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_contact_list_is_a_no_op() {
	let page = FakePage::new();
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run::<&str>(&[], &session()).await;

	assert_eq!(report.total, 0);
	assert!(report.is_complete());
	assert!(page.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn contacts_are_processed_in_order_without_dedup() {
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox());
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice", "ghost", "alice"], &session()).await;

	let order: Vec<_> = report.records.iter().map(|r| r.contact.as_str()).collect();
	assert_eq!(order, ["alice", "ghost", "alice"]);
	assert_eq!(report.attempted + report.not_attempted.len(), 3);
	assert_eq!(report.sent, 2);
}

#[tokio::test(start_paused = true)]
async fn blank_entries_are_counted_without_navigation() {
	let page = FakePage::new().route(profile_with_id("alice", "6800000000000000001")).route(inbox());
	let config = config();
	let ctx = RunContext::new(&page, &config, SnapshotSink::disabled());

	let report = Orchestrator::new(&ctx).run(&["alice", "  "], &session()).await;

	assert_eq!(report.total, 2);
	assert_eq!(report.attempted + report.not_attempted.len(), 2);
	assert_eq!(report.sent, 1);
	assert_eq!(report.failed.len(), 1);
	assert_eq!(report.failed[0].outcome, AttemptOutcome::NotFound);
	assert_eq!(report.records[1].attempts, 0);
	assert_eq!(page.sent(), vec![DEFAULT_MESSAGE.to_string()]);
}
