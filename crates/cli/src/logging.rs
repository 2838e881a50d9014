use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber.
///
/// `verbose` maps to the default filter (0: warn, 1: info, 2+: debug) and
/// `RUST_LOG` overrides it. When `log_file` is given, events are also
/// appended there without colours; an unopenable file is reported on stderr
/// and skipped.
pub fn init_logging(verbose: u8, log_file: Option<&Path>) {
	let default = match verbose {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

	let file_layer = log_file.and_then(|path| match OpenOptions::new().create(true).append(true).open(path) {
		Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
		Err(err) => {
			eprintln!("cannot open log file {}: {err}", path.display());
			None
		}
	});

	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(true))
		.with(file_layer)
		.try_init();
}
