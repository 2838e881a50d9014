//! Engine error types.

use thiserror::Error;

/// Errors raised by browser capability calls and engine plumbing.
///
/// Every variant is recoverable from the run's point of view: the delivery
/// state machine converts them into attempt outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("timed out after {ms}ms waiting for {condition}")]
	Timeout { ms: u64, condition: String },

	#[error("element detached from the document: {0}")]
	Detached(String),

	#[error("navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("browser error: {0}")]
	Browser(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl EngineError {
	/// Returns `true` for bounded-wait expiries.
	pub fn is_timeout(&self) -> bool {
		matches!(self, EngineError::Timeout { .. })
	}
}

pub type Result<T> = std::result::Result<T, EngineError>;
