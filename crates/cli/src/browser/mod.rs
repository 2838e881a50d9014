//! Chromium binding for the engine's page capability.

mod chromium;

pub use chromium::{ChromiumPage, ChromiumSession, LaunchOptions};
