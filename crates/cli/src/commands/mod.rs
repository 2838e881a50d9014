mod auth;
mod run;

use crate::cli::{AuthAction, Commands};
use crate::error::Result;

/// Runs `command` and returns the process exit code.
pub async fn dispatch(command: Commands) -> Result<i32> {
	match command {
		Commands::Run(args) => run::execute(args).await,
		Commands::Auth { action } => match action {
			AuthAction::Login { output, timeout, config } => auth::login(&output, timeout, config.as_deref()).await,
			AuthAction::Show { file } => auth::show(&file),
			AuthAction::Check { session, browser } => auth::check(&session, &browser).await,
		},
	}
}
