//! Single-request HTTP transport.
//!
//! A transport issues exactly one GET and reports what came back. It never
//! follows redirects; the fetcher does that so it can count hops.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, NoProxy, Proxy, StatusCode};
use url::Url;

use feedgrab_core::Error;

use super::FetchConfig;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/rss+xml,application/xml;q=0.9,*/*;q=0.8";

/// What one request returned.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// `Location` header, if present.
    pub location: Option<String>,
    pub content_type: Option<String>,
    /// Body bytes. Only read for success statuses.
    pub body: Bytes,
}

impl RawResponse {
    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self { status: StatusCode::OK, location: None, content_type: None, body: body.into() }
    }

    /// A redirect with the given status pointing at `location`.
    pub fn redirect(status: StatusCode, location: impl Into<String>) -> Self {
        Self { status, location: Some(location.into()), content_type: None, body: Bytes::new() }
    }

    /// A bodiless response with an arbitrary status.
    pub fn status(status: StatusCode) -> Self {
        Self { status, location: None, content_type: None, body: Bytes::new() }
    }
}

/// Transport-level failure of a single request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{len} bytes exceeds {max}")]
    TooLarge { len: u64, max: usize },

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TransportError::Timeout } else { TransportError::Other(err.to_string()) }
    }
}

/// Issues one GET request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    max_bytes: usize,
}

impl HttpTransport {
    /// Build the HTTP client from the fetch configuration.
    ///
    /// Redirects are disabled. Proxies come only from `config`: `proxy` covers
    /// every scheme, otherwise `http_proxy` and `https_proxy` apply to their
    /// own scheme. Hosts matching `no_proxy` bypass them.
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        let builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        let proxies = configured_proxies(config)?;
        let builder = if proxies.is_empty() {
            builder.no_proxy()
        } else {
            tracing::debug!(count = proxies.len(), "using configured proxies for outbound requests");
            proxies.into_iter().fold(builder, |builder, proxy| builder.proxy(proxy))
        };

        let http = builder
            .build()
            .map_err(|e| Error::HttpClient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, max_bytes: config.max_bytes })
    }
}

fn configured_proxies(config: &FetchConfig) -> Result<Vec<Proxy>, Error> {
    let bypass = config.no_proxy.as_deref().and_then(NoProxy::from_string);
    let invalid = |url: &str, e: reqwest::Error| Error::HttpClient(format!("invalid proxy {url}: {e}"));

    let mut proxies = Vec::new();
    if let Some(url) = &config.proxy {
        proxies.push(Proxy::all(url).map_err(|e| invalid(url, e))?);
    } else {
        if let Some(url) = &config.http_proxy {
            proxies.push(Proxy::http(url).map_err(|e| invalid(url, e))?);
        }
        if let Some(url) = &config.https_proxy {
            proxies.push(Proxy::https(url).map_err(|e| invalid(url, e))?);
        }
    }

    Ok(proxies.into_iter().map(|proxy| proxy.no_proxy(bypass.clone())).collect())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, HeaderValue::from_static(ACCEPT))
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers();
        let location = headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if !status.is_success() {
            return Ok(RawResponse { status, location, content_type, body: Bytes::new() });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.max_bytes
        {
            return Err(TransportError::TooLarge { len, max: self.max_bytes });
        }

        let body = response.bytes().await?;

        if body.len() > self.max_bytes {
            return Err(TransportError::TooLarge { len: body.len() as u64, max: self.max_bytes });
        }

        Ok(RawResponse { status, location, content_type, body })
    }
}
