//! Command-line front end for the streak delivery engine.
//!
//! Loads contacts, session cookies and engine tuning from flags, the
//! environment and files, drives a Chromium page through
//! [`browser::ChromiumPage`], and hosts the session-capture commands.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

pub use error::{CliError, Result};
