//! SQLite persistence for captured CSI frames.
//!
//! A finished session's capture buffer is written as one batch: every
//! record is parsed, malformed records are excluded, and all survivors
//! land in a single transaction sharing one capture timestamp and the
//! caller's scenario label.

pub mod error;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::CsiStore;
