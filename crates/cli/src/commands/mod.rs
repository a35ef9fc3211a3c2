//! Subcommand implementations.

pub mod fetch;
pub mod get;
pub mod grab;
pub mod keys;
pub mod purge;
