//! Core types and shared functionality for feedgrab.
//!
//! This crate provides:
//! - Persistent per-session key/value store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{CacheStore, EntrySummary, Payload};
