//! In-memory page for exercising the engine without a browser.
//!
//! Routes are keyed by URL prefix (longest prefix wins) and carry a title,
//! inline HTML and a flat list of elements. Every capability call is
//! journaled so tests can assert on what the engine touched.
//!
//! # Example
//!
//! ```ignore
//! let page = FakePage::new()
//!     .route(FakeRoute::new("https://platform.example/@alice").element(FakeElement::new(r#"[data-e2e="user-message"]"#, "Message")));
//! page.goto("https://platform.example/@alice", Duration::from_secs(5)).await?;
//! assert_eq!(page.calls()[0], FakeCall::Goto("https://platform.example/@alice".into()));
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{EngineError, Result};
use crate::page::{BrowserPage, ElementQuery, Key};
use crate::session::SessionContext;

/// CSS pattern a fake conversation renders sent messages with.
pub const ECHO_CSS: &str = r#"[data-e2e="chat-item"]"#;

/// A scripted element.
#[derive(Debug, Clone)]
pub struct FakeElement {
	pub css: String,
	pub text: String,
	pub visible: bool,
	/// URL the page moves to when this element is clicked.
	pub navigates_to: Option<String>,
}

impl FakeElement {
	pub fn new(css: impl Into<String>, text: impl Into<String>) -> Self {
		Self {
			css: css.into(),
			text: text.into(),
			visible: true,
			navigates_to: None,
		}
	}

	pub fn hidden(mut self) -> Self {
		self.visible = false;
		self
	}

	pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
		self.navigates_to = Some(url.into());
		self
	}

	fn matches(&self, query: &ElementQuery) -> bool {
		self.css == query.css && query.text.as_ref().is_none_or(|t| t.matches(&self.text))
	}
}

/// A scripted page state reachable by URL prefix.
#[derive(Debug, Clone, Default)]
pub struct FakeRoute {
	prefix: String,
	title: String,
	html: String,
	elements: Vec<FakeElement>,
	redirect: Option<String>,
	goto_timeout: bool,
	goto_error: bool,
	detached_actions: bool,
	echo_sent: bool,
}

impl FakeRoute {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			..Self::default()
		}
	}

	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	pub fn html(mut self, html: impl Into<String>) -> Self {
		self.html = html.into();
		self
	}

	pub fn element(mut self, element: FakeElement) -> Self {
		self.elements.push(element);
		self
	}

	/// Navigation here lands on `url` instead (one hop, not followed further).
	pub fn redirect_to(mut self, url: impl Into<String>) -> Self {
		self.redirect = Some(url.into());
		self
	}

	/// Navigation commits but the load wait expires.
	pub fn goto_times_out(mut self) -> Self {
		self.goto_timeout = true;
		self
	}

	/// Navigation fails outright.
	pub fn goto_fails(mut self) -> Self {
		self.goto_error = true;
		self
	}

	/// Clicks and fills report a detached node.
	pub fn detached_actions(mut self) -> Self {
		self.detached_actions = true;
		self
	}

	/// Committed messages are rendered back as chat bubbles.
	pub fn echo_sent(mut self) -> Self {
		self.echo_sent = true;
		self
	}
}

/// One journaled capability call.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
	ApplySession,
	Goto(String),
	Reload,
	Count(String),
	IsVisible(String, usize),
	Click(String, usize),
	Fill(String, usize, String),
	Press(Key),
	Type(String),
	Screenshot(PathBuf),
}

#[derive(Default)]
struct FakeState {
	routes: Vec<FakeRoute>,
	url: String,
	calls: Vec<FakeCall>,
	buffer: String,
	sent: Vec<String>,
	reject_session: bool,
}

impl FakeState {
	fn route_index(&self, url: &str) -> Option<usize> {
		self.routes
			.iter()
			.enumerate()
			.filter(|(_, r)| url.starts_with(r.prefix.as_str()))
			.max_by_key(|(_, r)| r.prefix.len())
			.map(|(i, _)| i)
	}

	fn current(&self) -> Option<&FakeRoute> {
		self.route_index(&self.url).map(|i| &self.routes[i])
	}

	fn matching(&self, query: &ElementQuery) -> Vec<&FakeElement> {
		self.current()
			.map(|r| r.elements.iter().filter(|e| e.matches(query)).collect())
			.unwrap_or_default()
	}

	fn element(&self, query: &ElementQuery, nth: usize) -> Result<FakeElement> {
		if self.current().is_some_and(|r| r.detached_actions) {
			return Err(EngineError::Detached(query.to_string()));
		}
		self.matching(query)
			.get(nth)
			.map(|e| (*e).clone())
			.ok_or_else(|| EngineError::Detached(format!("{query} #{nth}")))
	}
}

/// Scripted [`BrowserPage`] with a call journal.
#[derive(Default)]
pub struct FakePage {
	state: Mutex<FakeState>,
}

impl FakePage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn route(self, route: FakeRoute) -> Self {
		self.state.lock().routes.push(route);
		self
	}

	/// Makes [`BrowserPage::apply_session`] fail.
	pub fn rejecting_session(self) -> Self {
		self.state.lock().reject_session = true;
		self
	}

	pub fn calls(&self) -> Vec<FakeCall> {
		self.state.lock().calls.clone()
	}

	/// Messages committed with Enter, in order.
	pub fn sent(&self) -> Vec<String> {
		self.state.lock().sent.clone()
	}

	pub fn url(&self) -> String {
		self.state.lock().url.clone()
	}

	/// Distinct CSS patterns passed to `count`, in first-seen order.
	pub fn queried_css(&self) -> Vec<String> {
		let mut seen: Vec<String> = Vec::new();
		for call in self.state.lock().calls.iter() {
			if let FakeCall::Count(css) = call {
				if !seen.contains(css) {
					seen.push(css.clone());
				}
			}
		}
		seen
	}

	pub fn goto_count(&self) -> usize {
		self.state.lock().calls.iter().filter(|c| matches!(c, FakeCall::Goto(_))).count()
	}
}

#[async_trait]
impl BrowserPage for FakePage {
	async fn apply_session(&self, _session: &SessionContext) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::ApplySession);
		if state.reject_session {
			return Err(EngineError::Browser("cookie injection rejected".into()));
		}
		Ok(())
	}

	async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::Goto(url.to_string()));
		state.buffer.clear();

		let Some(index) = state.route_index(url) else {
			state.url = url.to_string();
			return Ok(());
		};
		let route = state.routes[index].clone();
		if route.goto_error {
			return Err(EngineError::Navigation {
				url: url.to_string(),
				message: "net::ERR_CONNECTION_RESET".into(),
			});
		}

		state.url = route.redirect.clone().unwrap_or_else(|| url.to_string());
		if route.goto_timeout {
			return Err(EngineError::Timeout {
				ms: timeout.as_millis() as u64,
				condition: format!("load of {url}"),
			});
		}
		Ok(())
	}

	async fn reload(&self, _timeout: Duration) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::Reload);
		state.buffer.clear();
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.state.lock().url.clone())
	}

	async fn title(&self) -> Result<String> {
		Ok(self.state.lock().current().map(|r| r.title.clone()).unwrap_or_default())
	}

	async fn content(&self) -> Result<String> {
		Ok(self.state.lock().current().map(|r| r.html.clone()).unwrap_or_default())
	}

	async fn count(&self, query: &ElementQuery) -> Result<usize> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::Count(query.css.clone()));
		Ok(state.matching(query).len())
	}

	async fn is_visible(&self, query: &ElementQuery, nth: usize) -> Result<bool> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::IsVisible(query.css.clone(), nth));
		Ok(state.matching(query).get(nth).is_some_and(|e| e.visible))
	}

	async fn click(&self, query: &ElementQuery, nth: usize) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::Click(query.css.clone(), nth));
		let element = state.element(query, nth)?;
		if let Some(url) = element.navigates_to {
			state.url = url;
			state.buffer.clear();
		}
		Ok(())
	}

	async fn fill(&self, query: &ElementQuery, nth: usize, text: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::Fill(query.css.clone(), nth, text.to_string()));
		state.element(query, nth)?;
		state.buffer = text.to_string();
		Ok(())
	}

	async fn press(&self, key: Key) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::Press(key));
		if key == Key::Enter && !state.buffer.is_empty() {
			let message = std::mem::take(&mut state.buffer);
			state.sent.push(message.clone());
			let url = state.url.clone();
			if let Some(index) = state.route_index(&url) {
				let route = &mut state.routes[index];
				if route.echo_sent {
					route.elements.push(FakeElement::new(ECHO_CSS, message));
				}
			}
		}
		Ok(())
	}

	async fn type_text(&self, text: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.calls.push(FakeCall::Type(text.to_string()));
		state.buffer.push_str(text);
		Ok(())
	}

	async fn screenshot(&self, path: &Path) -> Result<()> {
		self.state.lock().calls.push(FakeCall::Screenshot(path.to_path_buf()));
		std::fs::write(path, b"\x89PNG fake")?;
		Ok(())
	}
}
