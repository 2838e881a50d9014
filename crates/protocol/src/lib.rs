//! Wire types for captured browser session state.
//!
//! This crate contains the serde-serializable shapes exchanged between the
//! session capture command and the delivery engine: cookie records as a
//! browser exports them, storage-state files, and viewport dimensions.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and file IO
//! * Compatible: Field names match the camelCase cookie export format
//! * Stable: Changes only when the captured format changes
//!
//! Session validation and navigation live in `streak-rs`.

pub mod cookie;
pub mod storage;
pub mod types;

pub use cookie::*;
pub use storage::*;
pub use types::*;
