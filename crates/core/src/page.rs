//! Browser capability consumed by the engine.
//!
//! The engine drives exactly one page at a time through [`BrowserPage`]. It
//! never reimplements navigation or input injection; a concrete browser
//! binding (or [`crate::fake::FakePage`] in tests) supplies them.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::session::SessionContext;

/// Case-insensitive "contains any of" matcher over an element's text.
///
/// The text an implementation matches against is the element's rendered
/// text plus its `aria-label`, `placeholder` and `data-placeholder`
/// attributes, so localized labels and empty-input hints both count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
	needles: Vec<String>,
}

impl TextMatch {
	pub fn any<I, S>(needles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self {
			needles: needles.into_iter().map(|n| n.as_ref().to_lowercase()).collect(),
		}
	}

	/// Lowercased needles.
	pub fn needles(&self) -> &[String] {
		&self.needles
	}

	pub fn matches(&self, haystack: &str) -> bool {
		let haystack = haystack.to_lowercase();
		self.needles.iter().any(|n| haystack.contains(n.as_str()))
	}
}

/// A concrete element query: CSS plus an optional text filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementQuery {
	pub css: String,
	pub text: Option<TextMatch>,
}

impl ElementQuery {
	pub fn css(css: impl Into<String>) -> Self {
		Self { css: css.into(), text: None }
	}

	pub fn with_text(mut self, text: TextMatch) -> Self {
		self.text = Some(text);
		self
	}
}

impl std::fmt::Display for ElementQuery {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.text {
			Some(text) => write!(f, "{} [text~{}]", self.css, text.needles().join("|")),
			None => write!(f, "{}", self.css),
		}
	}
}

/// Keys the engine injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
	Enter,
	Tab,
}

impl Key {
	pub fn name(self) -> &'static str {
		match self {
			Key::Enter => "Enter",
			Key::Tab => "Tab",
		}
	}
}

/// The single page the engine operates on.
///
/// Implementations must return [`crate::EngineError::Timeout`] when a bounded
/// wait expires so callers can treat partial loads as soft failures.
#[async_trait]
pub trait BrowserPage: Send + Sync {
	/// Installs cookies, user agent and viewport before any navigation.
	async fn apply_session(&self, session: &SessionContext) -> Result<()>;

	async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

	async fn reload(&self, timeout: Duration) -> Result<()>;

	async fn current_url(&self) -> Result<String>;

	async fn title(&self) -> Result<String>;

	/// Serialized DOM of the current document, inline scripts included.
	async fn content(&self) -> Result<String>;

	/// Number of elements matching `query` that are attached to the document.
	async fn count(&self, query: &ElementQuery) -> Result<usize>;

	/// Whether the `nth` match is rendered and interactable right now.
	async fn is_visible(&self, query: &ElementQuery, nth: usize) -> Result<bool>;

	async fn click(&self, query: &ElementQuery, nth: usize) -> Result<()>;

	/// Focuses the `nth` match and replaces its content with `text`.
	async fn fill(&self, query: &ElementQuery, nth: usize, text: &str) -> Result<()>;

	/// Presses `key` on whatever currently holds focus.
	async fn press(&self, key: Key) -> Result<()>;

	/// Types `text` into whatever currently holds focus.
	async fn type_text(&self, text: &str) -> Result<()>;

	async fn screenshot(&self, path: &Path) -> Result<()>;
}
