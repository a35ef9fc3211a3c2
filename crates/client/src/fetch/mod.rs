//! Resilient HTTP fetch with bounded redirects and timeout retries.
//!
//! ### Redirects
//! - Followed manually, one request per hop
//! - Hop budget (default: 5) counts requests; running out is a redirect loop
//! - Relative `Location` values are resolved against the current URL
//!
//! ### Timeouts
//! - One timeout covers a whole attempt, redirects included (default: 15s)
//! - A timed-out attempt restarts from the original URL after a pause (default: 1s)
//! - Attempt budget (default: 4) is the total number of attempts
//!
//! ### Failures
//! Nothing here returns an error for network trouble. Every failure becomes
//! [`FetchOutcome::Failed`] so one unreachable server cannot abort a run.

pub mod transport;
pub mod url;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::Url;
use std::time::{Duration, Instant};

pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
pub use self::url::{UrlError, parse_fetch_url, resolve_location};

use feedgrab_core::{AppConfig, Error, Payload};

/// Configuration for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "feedgrab/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Timeout for one attempt including all redirect hops (default: 15s)
    pub timeout: Duration,

    /// Total attempts when an attempt times out (default: 4)
    pub max_retries: u32,

    /// Maximum requests issued while following redirects (default: 5)
    pub max_redirects: u32,

    /// Pause before re-trying a timed-out attempt (default: 1s)
    pub retry_backoff: Duration,

    /// Proxy for all requests, overriding the per-scheme proxies
    pub proxy: Option<String>,

    /// Proxy for `http://` requests
    pub http_proxy: Option<String>,

    /// Proxy for `https://` requests
    pub https_proxy: Option<String>,

    /// Hosts reached directly even when a proxy is set, `no_proxy` syntax
    pub no_proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "feedgrab/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_secs(15),
            max_retries: 4,
            max_redirects: 5,
            retry_backoff: Duration::from_secs(1),
            proxy: None,
            http_proxy: None,
            https_proxy: None,
            no_proxy: None,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_retries: config.max_retries,
            max_redirects: config.max_redirects,
            retry_backoff: config.retry_backoff(),
            proxy: config.proxy.clone(),
            http_proxy: config.http_proxy.clone(),
            https_proxy: config.https_proxy.clone(),
            no_proxy: config.no_proxy.clone(),
        }
    }
}

/// Why a fetch produced no body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("followed {max_redirects} redirects without reaching a response")]
    RedirectLoop { max_redirects: u32 },

    #[error("redirect status {status} without usable Location")]
    MissingLocation { status: u16 },

    #[error("timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("response too large: {len} bytes exceeds {max}")]
    TooLarge { len: u64, max: usize },

    #[error("transport error: {0}")]
    Transport(String),
}

/// A successfully fetched body and how it was reached.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// The URL requested
    pub url: Url,
    /// The URL that answered after redirects
    pub final_url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    /// Response body; may be empty
    pub bytes: Bytes,
    /// Attempts used, 1 when the first attempt succeeded
    pub attempts: u32,
    /// Redirect hops followed in the successful attempt
    pub redirects: u32,
    /// Time taken across all attempts in milliseconds
    pub fetch_ms: u64,
}

/// Result of one logical fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(FetchedBody),
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }

    pub fn body(&self) -> Option<&Bytes> {
        match self {
            FetchOutcome::Fetched(fetched) => Some(&fetched.bytes),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchOutcome::Fetched(_) => None,
            FetchOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn into_body(self) -> Option<Bytes> {
        match self {
            FetchOutcome::Fetched(fetched) => Some(fetched.bytes),
            FetchOutcome::Failed(_) => None,
        }
    }

    /// Store representation: the body, or a failure marker.
    pub fn to_payload(&self) -> Payload {
        match self {
            FetchOutcome::Fetched(fetched) => Payload::Body(fetched.bytes.to_vec()),
            FetchOutcome::Failed(_) => Payload::Failed,
        }
    }
}

/// Why one attempt ended without a body.
enum AttemptError {
    TimedOut,
    Failed(FetchFailure),
}

impl From<TransportError> for AttemptError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => AttemptError::TimedOut,
            TransportError::TooLarge { len, max } => AttemptError::Failed(FetchFailure::TooLarge { len, max }),
            TransportError::Other(msg) => AttemptError::Failed(FetchFailure::Transport(msg)),
        }
    }
}

struct Resolved {
    final_url: Url,
    response: RawResponse,
    redirects: u32,
}

/// Fetches one URL at a time over a [`Transport`].
pub struct Fetcher<T = HttpTransport> {
    transport: T,
    config: FetchConfig,
}

impl Fetcher<HttpTransport> {
    /// Create a fetcher backed by reqwest.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { transport, config })
    }
}

impl<T: Transport> Fetcher<T> {
    /// Create a fetcher over a custom transport.
    pub fn with_transport(config: FetchConfig, transport: T) -> Self {
        Self { transport, config }
    }

    /// Fetch `url`, following redirects and retrying timeouts.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let start = Instant::now();

        let url = match parse_fetch_url(url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("not fetching {:?}: {}", url, e);
                return FetchOutcome::Failed(FetchFailure::InvalidUrl(e.to_string()));
            }
        };

        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            let result = match tokio::time::timeout(self.config.timeout, self.follow_redirects(&url)).await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::TimedOut),
            };

            match result {
                Ok(resolved) => {
                    let fetch_ms = start.elapsed().as_millis() as u64;
                    tracing::debug!(
                        "fetched {} -> {} in {}ms ({} bytes, attempt {})",
                        url,
                        resolved.final_url,
                        fetch_ms,
                        resolved.response.body.len(),
                        attempt
                    );
                    return FetchOutcome::Fetched(FetchedBody {
                        url,
                        final_url: resolved.final_url,
                        status: resolved.response.status,
                        content_type: resolved.response.content_type,
                        bytes: resolved.response.body,
                        attempts: attempt,
                        redirects: resolved.redirects,
                        fetch_ms,
                    });
                }
                Err(AttemptError::TimedOut) => {
                    if attempt < attempts {
                        tracing::warn!(url = %url, attempt, attempts, "fetch timed out, retrying");
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
                Err(AttemptError::Failed(failure)) => {
                    tracing::warn!(url = %url, error = %failure, "fetch failed");
                    return FetchOutcome::Failed(failure);
                }
            }
        }

        tracing::warn!(url = %url, attempts, "fetch timed out, giving up");
        FetchOutcome::Failed(FetchFailure::TimedOut { attempts })
    }

    async fn follow_redirects(&self, url: &Url) -> Result<Resolved, AttemptError> {
        let mut current = url.clone();
        let mut hops_left = self.config.max_redirects;
        let mut redirects = 0;

        loop {
            if hops_left == 0 {
                return Err(AttemptError::Failed(FetchFailure::RedirectLoop {
                    max_redirects: self.config.max_redirects,
                }));
            }

            let response = self.transport.get(&current).await?;
            let status = response.status;

            if status.is_success() {
                return Ok(Resolved { final_url: current, response, redirects });
            }

            if !status.is_redirection() {
                return Err(AttemptError::Failed(FetchFailure::HttpStatus(status.as_u16())));
            }

            let next = response
                .location
                .as_deref()
                .and_then(|location| resolve_location(&current, location).ok())
                .ok_or(AttemptError::Failed(FetchFailure::MissingLocation { status: status.as_u16() }))?;

            tracing::debug!("redirect {} {} -> {}", status.as_u16(), current, next);
            current = next;
            hops_left -= 1;
            redirects += 1;
        }
    }

    /// Get reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}
