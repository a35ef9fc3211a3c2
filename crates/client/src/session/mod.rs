//! Cache session: cached fetching for one run over one feed.
//!
//! A session owns a store file named after it and remembers every key
//! requested through [`CacheSession::get_cached`]. [`CacheSession::cleanup`]
//! then drops every stored entry that was not requested in this run.
//!
//! The store is opened around each operation and closed right after, so a
//! session never holds the file while waiting on the network.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use feedgrab_core::store::{DEFAULT_NAMESPACE, default_base_path, store_path};
use feedgrab_core::{AppConfig, CacheStore, EntrySummary, Error};

use crate::fetch::{FetchConfig, FetchOutcome, Fetcher, HttpTransport, Transport};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Cleaned,
    Closed,
}

/// Result of an eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Entries left in the store.
    pub retained: u64,
    /// Keys that were deleted.
    pub removed: Vec<String>,
}

/// Cached fetching scoped to a named session.
pub struct CacheSession<T = HttpTransport> {
    name: String,
    store_path: PathBuf,
    fetcher: Fetcher<T>,
    used_keys: HashSet<String>,
    state: SessionState,
}

impl CacheSession<HttpTransport> {
    /// Open a session using the store location and fetch settings of `config`.
    pub fn from_config(name: &str, config: &AppConfig) -> Result<Self, Error> {
        let store_path = config.session_store_path(name)?;
        let fetcher = Fetcher::new(FetchConfig::from(config))?;
        Ok(Self::at_path(name, store_path, fetcher))
    }
}

impl<T: Transport> CacheSession<T> {
    /// Open a session whose store lives under `base_path` (home directory if `None`).
    ///
    /// The store file does not need to exist yet.
    pub fn open(name: &str, base_path: Option<&Path>, fetcher: Fetcher<T>) -> Result<Self, Error> {
        let base = match base_path {
            Some(path) => path.to_path_buf(),
            None => default_base_path()?,
        };
        let store_path = store_path(&base, DEFAULT_NAMESPACE, name)?;
        Ok(Self::at_path(name, store_path, fetcher))
    }

    fn at_path(name: &str, store_path: PathBuf, fetcher: Fetcher<T>) -> Self {
        tracing::debug!(session = name, path = %store_path.display(), "session opened");
        Self { name: name.to_string(), store_path, fetcher, used_keys: HashSet::new(), state: SessionState::Created }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Keys requested through `get_cached` so far.
    pub fn used_keys(&self) -> &HashSet<String> {
        &self.used_keys
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    /// Get `url` from the store, fetching and storing it on a miss.
    ///
    /// Returns `None` when the fetch failed. Failures are stored too, and a
    /// stored failure is returned as `None` without fetching again.
    ///
    /// # Errors
    ///
    /// Only store errors are returned; network trouble is a `None`.
    pub async fn get_cached(&mut self, url: &str) -> Result<Option<Vec<u8>>, Error> {
        self.ensure_open()?;
        self.used_keys.insert(url.to_string());
        self.state = SessionState::Active;

        let store = self.open_store().await?;
        let result = store.get(url).await;
        if let Some(payload) = release(store, result).await? {
            tracing::debug!(session = %self.name, failed = payload.is_failed(), "cache hit for {}", url);
            return Ok(payload.into_body());
        }

        tracing::debug!(session = %self.name, "cache miss for {}", url);
        let payload = self.fetcher.fetch(url).await.to_payload();

        let store = self.open_store().await?;
        let result = store.put(url, &payload).await;
        release(store, result).await?;

        Ok(payload.into_body())
    }

    /// [`get_cached`](Self::get_cached), decoded as UTF-8 (lossy).
    pub async fn get_cached_text(&mut self, url: &str) -> Result<Option<String>, Error> {
        let body = self.get_cached(url).await?;
        Ok(body.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Fetch `url` without touching the store or the used keys.
    ///
    /// Meant for the run's primary resource, which is never cached.
    pub async fn get_uncached(&mut self, url: &str) -> Result<FetchOutcome, Error> {
        self.ensure_open()?;
        self.state = SessionState::Active;
        Ok(self.fetcher.fetch(url).await)
    }

    /// Delete every stored key that was not requested in this session.
    ///
    /// With no keys requested this empties the store.
    pub async fn cleanup(&mut self) -> Result<CleanupReport, Error> {
        self.ensure_open()?;

        let store = self.open_store().await?;
        let result = evict_unused(&store, &self.used_keys).await;
        let report = release(store, result).await?;

        tracing::info!(
            session = %self.name,
            retained = report.retained,
            removed = report.removed.len(),
            "cache cleanup finished"
        );

        self.state = SessionState::Cleaned;
        Ok(report)
    }

    /// Summaries of everything in this session's store.
    pub async fn entries(&self) -> Result<Vec<EntrySummary>, Error> {
        self.ensure_open()?;
        let store = self.open_store().await?;
        let result = store.list_entries().await;
        release(store, result).await
    }

    /// End the session. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::debug!(session = %self.name, used = self.used_keys.len(), "session closed");
            self.state = SessionState::Closed;
        }
    }

    fn ensure_open(&self) -> Result<(), Error> {
        match self.state {
            SessionState::Closed => Err(Error::SessionClosed(self.name.clone())),
            _ => Ok(()),
        }
    }

    async fn open_store(&self) -> Result<CacheStore, Error> {
        CacheStore::open(&self.store_path).await
    }
}

async fn evict_unused(store: &CacheStore, used_keys: &HashSet<String>) -> Result<CleanupReport, Error> {
    let unused: Vec<String> = store
        .keys()
        .await?
        .into_iter()
        .filter(|key| !used_keys.contains(key))
        .collect();

    store.delete_keys(unused.clone()).await?;
    let retained = store.len().await?;

    Ok(CleanupReport { retained, removed: unused })
}

/// Close `store`, then hand back `result`. The operation's error wins over a close error.
async fn release<R>(store: CacheStore, result: Result<R, Error>) -> Result<R, Error> {
    let closed = store.close().await;
    let value = result?;
    closed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::StubTransport;
    use crate::fetch::{RawResponse, TransportError};
    use feedgrab_core::Payload;
    use reqwest::{StatusCode, Url};
    use std::time::Duration;

    type Respond = fn(&Url) -> Result<RawResponse, TransportError>;

    fn echo_path(url: &Url) -> Result<RawResponse, TransportError> {
        Ok(RawResponse::ok(format!("body of {}", url.path())))
    }

    fn not_found(_: &Url) -> Result<RawResponse, TransportError> {
        Ok(RawResponse::status(StatusCode::NOT_FOUND))
    }

    fn stub_session(dir: &Path, name: &str, respond: Respond) -> CacheSession<StubTransport<Respond>> {
        let config = FetchConfig { retry_backoff: Duration::ZERO, ..Default::default() };
        let fetcher = Fetcher::with_transport(config, StubTransport::new(respond));
        CacheSession::open(name, Some(dir), fetcher).unwrap()
    }

    async fn seed(path: &Path, entries: &[(&str, &str)]) {
        let store = CacheStore::open(path).await.unwrap();
        for (key, body) in entries {
            store.put(key, &Payload::Body(body.as_bytes().to_vec())).await.unwrap();
        }
        store.close().await.unwrap();
    }

    async fn stored_keys(path: &Path) -> Vec<String> {
        let store = CacheStore::open(path).await.unwrap();
        let keys = store.keys().await.unwrap();
        store.close().await.unwrap();
        keys
    }

    #[tokio::test]
    async fn test_store_path_derived_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let session = stub_session(dir.path(), "heise", echo_path);

        assert_eq!(session.store_path(), dir.path().join(".feedgrab").join("heise.db"));
        assert_eq!(session.state(), SessionState::Created);
        assert!(!session.store_path().exists());
    }

    #[tokio::test]
    async fn test_invalid_session_name() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::with_transport(FetchConfig::default(), StubTransport::new(echo_path as Respond));

        let result = CacheSession::open("../escape", Some(dir.path()), fetcher);
        assert!(matches!(result, Err(Error::InvalidSessionName(_))));
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);
        seed(session.store_path(), &[("https://example.com/k", "stored value")]).await;

        let body = session.get_cached("https://example.com/k").await.unwrap();

        assert_eq!(body, Some(b"stored value".to_vec()));
        assert_eq!(session.fetcher().transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_once_and_stores() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);

        let first = session.get_cached_text("https://example.com/a").await.unwrap();
        let second = session.get_cached_text("https://example.com/a").await.unwrap();

        assert_eq!(first.as_deref(), Some("body of /a"));
        assert_eq!(second, first);
        assert_eq!(session.fetcher().transport().calls(), 1);
        assert_eq!(stored_keys(session.store_path()).await, vec!["https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_cache_survives_across_sessions() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = stub_session(dir.path(), "feed", echo_path);
        first.get_cached("https://example.com/a").await.unwrap();
        first.close();

        let mut second = stub_session(dir.path(), "feed", echo_path);
        let body = second.get_cached_text("https://example.com/a").await.unwrap();

        assert_eq!(body.as_deref(), Some("body of /a"));
        assert_eq!(second.fetcher().transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_sessions_with_different_names_do_not_share() {
        let dir = tempfile::tempdir().unwrap();

        let mut news = stub_session(dir.path(), "news", echo_path);
        news.get_cached("https://example.com/a").await.unwrap();

        let mut security = stub_session(dir.path(), "security", echo_path);
        security.get_cached("https://example.com/a").await.unwrap();

        assert_ne!(news.store_path(), security.store_path());
        assert_eq!(security.fetcher().transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_used_key_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);

        for key in ["https://e.com/1", "https://e.com/2", "https://e.com/1", "https://e.com/3"] {
            session.get_cached(key).await.unwrap();
        }

        let expected: HashSet<String> = ["https://e.com/1", "https://e.com/2", "https://e.com/3"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(session.used_keys(), &expected);
    }

    #[tokio::test]
    async fn test_get_uncached_bypasses_store_and_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);

        let outcome = session.get_uncached("https://example.com/feed.rdf").await.unwrap();
        let outcome_again = session.get_uncached("https://example.com/feed.rdf").await.unwrap();

        assert!(outcome.is_fetched());
        assert!(outcome_again.is_fetched());
        assert_eq!(session.fetcher().transport().calls(), 2);
        assert!(session.used_keys().is_empty());
        assert!(!session.store_path().exists());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_unused() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);
        seed(session.store_path(), &[("A", "x"), ("B", "y"), ("C", "z")]).await;

        assert_eq!(session.get_cached_text("A").await.unwrap().as_deref(), Some("x"));
        assert_eq!(session.get_cached_text("C").await.unwrap().as_deref(), Some("z"));

        let report = session.cleanup().await.unwrap();

        assert_eq!(report, CleanupReport { retained: 2, removed: vec!["B".to_string()] });
        assert_eq!(session.state(), SessionState::Cleaned);

        let store = CacheStore::open(session.store_path()).await.unwrap();
        assert_eq!(store.get("A").await.unwrap(), Some(Payload::Body(b"x".to_vec())));
        assert_eq!(store.get("C").await.unwrap(), Some(Payload::Body(b"z".to_vec())));
        assert_eq!(store.get("B").await.unwrap(), None);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_keeps_fresh_and_hit_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);
        seed(session.store_path(), &[("https://e.com/old", "o"), ("https://e.com/hit", "h")]).await;

        session.get_cached("https://e.com/hit").await.unwrap();
        session.get_cached("https://e.com/new").await.unwrap();
        session.cleanup().await.unwrap();

        assert_eq!(stored_keys(session.store_path()).await, vec!["https://e.com/hit", "https://e.com/new"]);
    }

    #[tokio::test]
    async fn test_cleanup_without_requests_empties_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "abandoned", echo_path);
        seed(session.store_path(), &[("A", "x"), ("B", "y")]).await;

        let report = session.cleanup().await.unwrap();

        assert_eq!(report.retained, 0);
        assert_eq!(report.removed, vec!["A", "B"]);
        assert!(stored_keys(session.store_path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_twice_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);
        seed(session.store_path(), &[("A", "x"), ("B", "y")]).await;
        session.get_cached("A").await.unwrap();

        session.cleanup().await.unwrap();
        let after_first = stored_keys(session.store_path()).await;
        let second = session.cleanup().await.unwrap();
        let after_second = stored_keys(session.store_path()).await;

        assert_eq!(after_first, after_second);
        assert!(second.removed.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_on_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "fresh", echo_path);

        let report = session.cleanup().await.unwrap();
        assert_eq!(report, CleanupReport::default());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_cached_and_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", not_found);

        assert_eq!(session.get_cached("https://example.com/gone").await.unwrap(), None);
        assert_eq!(session.get_cached("https://example.com/gone").await.unwrap(), None);

        assert_eq!(session.fetcher().transport().calls(), 1);
        let store = CacheStore::open(session.store_path()).await.unwrap();
        assert_eq!(store.get("https://example.com/gone").await.unwrap(), Some(Payload::Failed));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_marker_survives_cleanup_when_used() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", not_found);

        session.get_cached("https://example.com/gone").await.unwrap();
        let report = session.cleanup().await.unwrap();

        assert_eq!(report.retained, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);
        session.get_cached("https://example.com/a").await.unwrap();

        session.close();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_operations_after_close_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);
        session.close();

        assert!(matches!(session.get_cached("https://e.com/a").await, Err(Error::SessionClosed(_))));
        assert!(matches!(session.get_uncached("https://e.com/a").await, Err(Error::SessionClosed(_))));
        assert!(matches!(session.cleanup().await, Err(Error::SessionClosed(_))));
        assert_eq!(session.fetcher().transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_store_io_error_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let mut session = stub_session(&blocker, "feed", echo_path);

        let result = session.get_cached("https://example.com/a").await;
        assert!(matches!(result, Err(Error::StoreIo(_))));
    }

    #[tokio::test]
    async fn test_entries_lists_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = stub_session(dir.path(), "feed", echo_path);
        session.get_cached("https://example.com/a").await.unwrap();

        let entries = session.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "https://example.com/a");
        assert_eq!(entries[0].size, "body of /a".len() as u64);
    }
}
