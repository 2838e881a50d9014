use thiserror::Error;

/// Fatal errors surfaced by CLI commands.
///
/// Per-contact delivery problems never reach this type; they are recorded in
/// the run report instead.
#[derive(Debug, Error)]
pub enum CliError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("invalid session: {0}")]
	Session(#[from] streak::SessionError),

	#[error("browser error: {0}")]
	Browser(String),

	#[error("{0}")]
	Engine(#[from] streak::EngineError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Whether the error stems from operator input rather than the browser.
	pub fn is_config(&self) -> bool {
		matches!(self, CliError::Config(_) | CliError::Session(_) | CliError::Json(_) | CliError::Anyhow(_))
	}
}

impl From<chromiumoxide::error::CdpError> for CliError {
	fn from(err: chromiumoxide::error::CdpError) -> Self {
		CliError::Browser(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, CliError>;
