//! SQLite-backed key/value store for cached fetch results.
//!
//! Each session owns one database file. This module provides:
//!
//! - Keyed storage of fetched bodies and failure markers
//! - Automatic schema migrations
//! - Deterministic store locations derived from a session name
//! - Bulk deletion used by the session eviction pass

pub mod connection;
pub mod entries;
pub mod location;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheStore;
pub use entries::{EntrySummary, Payload};
pub use location::{DEFAULT_NAMESPACE, STORE_EXTENSION, default_base_path, store_path, validate_session_name};
