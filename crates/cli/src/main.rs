use clap::Parser;
use streak_cli::cli::Cli;
use streak_cli::{commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let _ = dotenvy::dotenv();
	let cli = Cli::parse();
	logging::init_logging(cli.verbose, cli.log_file().as_deref());

	match commands::dispatch(cli.command).await {
		Ok(code) => std::process::exit(code),
		Err(err) => {
			error!(target = "streak", error = %err, "command failed");
			eprintln!("error: {err}");
			std::process::exit(1);
		}
	}
}
