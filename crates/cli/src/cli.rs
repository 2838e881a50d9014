use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Log file the `run` command appends to unless told otherwise.
pub const DEFAULT_LOG_FILE: &str = "streak_bot.log";

#[derive(Parser, Debug)]
#[command(name = "streak")]
#[command(about = "Keep conversations alive by sending a daily message through a logged-in browser")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Append logs to this file as well as stderr
	#[arg(long, global = true, value_name = "FILE")]
	pub log_file: Option<PathBuf>,

	/// Do not write a log file
	#[arg(long, global = true, conflicts_with = "log_file")]
	pub no_log_file: bool,

	#[command(subcommand)]
	pub command: Commands,
}

impl Cli {
	/// Effective log file: explicit path, else the default for `run`.
	pub fn log_file(&self) -> Option<PathBuf> {
		if self.no_log_file {
			return None;
		}
		match (&self.log_file, &self.command) {
			(Some(path), _) => Some(path.clone()),
			(None, Commands::Run(_)) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
			(None, _) => None,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Send the message to every configured contact
	Run(RunArgs),

	/// Capture and inspect the session cookies
	Auth {
		#[command(subcommand)]
		action: AuthAction,
	},
}

#[derive(Args, Debug)]
pub struct RunArgs {
	/// Comma-separated contacts (handles or profile URLs)
	#[arg(long, env = "FRIENDS_LIST")]
	pub contacts: Option<String>,

	/// Fallback contact list, one per line or comma separated
	#[arg(long, value_name = "FILE", default_value = "friends.txt")]
	pub contacts_file: PathBuf,

	/// Message to send, overriding the config file
	#[arg(short, long)]
	pub message: Option<String>,

	/// Directory for diagnostic screenshots
	#[arg(long, value_name = "DIR", default_value = "artifacts")]
	pub artifacts_dir: PathBuf,

	/// Do not save diagnostic screenshots
	#[arg(long)]
	pub no_artifacts: bool,

	#[command(flatten)]
	pub session: SessionArgs,

	#[command(flatten)]
	pub browser: BrowserArgs,
}

/// Where the session cookies come from.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionArgs {
	/// Session cookies as a JSON string
	#[arg(long, env = "TIKTOK_COOKIES", hide_env_values = true)]
	pub cookies: Option<String>,

	/// Session cookies file (cookie array or storage state)
	#[arg(long, value_name = "FILE")]
	pub cookies_file: Option<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct BrowserArgs {
	/// Engine configuration file (JSON)
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Show the browser window
	#[arg(long)]
	pub headed: bool,
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
	/// Interactive login - opens a browser for manual login, then saves its cookies
	Login {
		/// File to save the cookies to
		#[arg(short, long, default_value = "cookies.json")]
		output: PathBuf,
		/// Wait time in seconds for manual login
		#[arg(short, long, default_value = "300")]
		timeout: u64,
		/// Engine configuration file (JSON), for the platform URLs
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,
	},

	/// Show the cookies in a saved session file
	Show {
		/// Session file to display
		#[arg(default_value = "cookies.json")]
		file: PathBuf,
	},

	/// Check whether the session still reaches the inbox
	Check {
		#[command(flatten)]
		session: SessionArgs,

		#[command(flatten)]
		browser: BrowserArgs,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_run_with_inline_contacts() {
		let args = vec!["streak", "run", "--contacts", "alice,bob", "--cookies-file", "c.json", "--headed"];
		let cli = Cli::try_parse_from(args).unwrap();

		match cli.command {
			Commands::Run(run) => {
				assert_eq!(run.contacts.as_deref(), Some("alice,bob"));
				assert_eq!(run.session.cookies_file, Some(PathBuf::from("c.json")));
				assert!(run.browser.headed);
				assert_eq!(run.contacts_file, PathBuf::from("friends.txt"));
			}
			_ => panic!("Expected Run command"),
		}
	}

	#[test]
	fn run_defaults_to_log_file() {
		let cli = Cli::try_parse_from(["streak", "run"]).unwrap();
		assert_eq!(cli.log_file(), Some(PathBuf::from(DEFAULT_LOG_FILE)));

		let cli = Cli::try_parse_from(["streak", "run", "--no-log-file"]).unwrap();
		assert_eq!(cli.log_file(), None);
	}

	#[test]
	fn auth_commands_log_only_when_asked() {
		let cli = Cli::try_parse_from(["streak", "auth", "show"]).unwrap();
		assert_eq!(cli.log_file(), None);

		let cli = Cli::try_parse_from(["streak", "--log-file", "x.log", "auth", "show"]).unwrap();
		assert_eq!(cli.log_file(), Some(PathBuf::from("x.log")));
	}

	#[test]
	fn parse_auth_login_defaults() {
		let cli = Cli::try_parse_from(["streak", "auth", "login"]).unwrap();

		match cli.command {
			Commands::Auth {
				action: AuthAction::Login { output, timeout, config },
			} => {
				assert_eq!(output, PathBuf::from("cookies.json"));
				assert_eq!(timeout, 300);
				assert!(config.is_none());
			}
			_ => panic!("Expected Auth Login command"),
		}
	}

	#[test]
	fn verbose_is_counted_globally() {
		let cli = Cli::try_parse_from(["streak", "auth", "show", "-vv"]).unwrap();
		assert_eq!(cli.verbose, 2);
	}

	#[test]
	fn log_file_flags_conflict() {
		assert!(Cli::try_parse_from(["streak", "--log-file", "a.log", "--no-log-file", "run"]).is_err());
	}
}
