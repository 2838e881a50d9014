//! Captured session files.
//!
//! Two on-disk shapes are accepted: a bare JSON array of cookies (what the
//! capture command writes) and a storage-state object with `cookies` and
//! `origins` keys.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cookie::Cookie;

/// Errors reading or writing session files.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("io error on {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid session JSON: {0}")]
	Json(#[from] serde_json::Error),
}

/// A single `localStorage` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalStorageEntry {
	pub name: String,
	pub value: String,
}

/// `localStorage` captured for one origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
	pub origin: String,
	#[serde(default)]
	pub local_storage: Vec<LocalStorageEntry>,
}

/// Cookies plus per-origin storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
	#[serde(default)]
	pub cookies: Vec<Cookie>,
	#[serde(default)]
	pub origins: Vec<OriginState>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SessionShape {
	Cookies(Vec<Cookie>),
	State(StorageState),
}

impl StorageState {
	/// Parses either accepted shape from a JSON string.
	pub fn from_json(raw: &str) -> Result<Self, StorageError> {
		let shape: SessionShape = serde_json::from_str(raw)?;
		Ok(match shape {
			SessionShape::Cookies(cookies) => Self { cookies, origins: Vec::new() },
			SessionShape::State(state) => state,
		})
	}

	/// Reads and parses a session file.
	pub fn from_file(path: &Path) -> Result<Self, StorageError> {
		let raw = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
			path: path.display().to_string(),
			source,
		})?;
		Self::from_json(&raw)
	}

	/// Writes the cookie list as a bare JSON array.
	pub fn write_cookies(&self, path: &Path) -> Result<(), StorageError> {
		let json = serde_json::to_string_pretty(&self.cookies)?;
		std::fs::write(path, json).map_err(|source| StorageError::Io {
			path: path.display().to_string(),
			source,
		})
	}
}
