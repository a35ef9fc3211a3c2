//! Client code for feedgrab.
//!
//! This crate provides the resilient fetcher and the cache session that
//! combines it with the per-session store from `feedgrab-core`.

pub mod fetch;
pub mod session;

pub use fetch::{
    FetchConfig, FetchFailure, FetchOutcome, FetchedBody, Fetcher, HttpTransport, RawResponse, Transport,
    TransportError,
};
pub use session::{CacheSession, CleanupReport, SessionState};
