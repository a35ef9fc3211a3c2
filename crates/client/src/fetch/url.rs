//! URL validation for fetch targets and redirect resolution.
//!
//! The caller's URL string stays the cache key untouched; the parsed form
//! here is only what goes on the wire.

use url::Url;

/// Error type for URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse an absolute http(s) URL for fetching.
///
/// 1. Trim leading/trailing whitespace
/// 2. Require an absolute URL with `http` or `https` scheme
/// 3. Remove fragment (#...), which is never sent to the server
pub fn parse_fetch_url(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    into_fetchable(parsed)
}

/// Resolve a `Location` header value against the URL that produced it.
///
/// Relative locations (`/next`, `../page`) are joined onto `base`.
pub fn resolve_location(base: &Url, location: &str) -> Result<Url, UrlError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(UrlError::Empty);
    }

    let joined = base.join(location).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    into_fetchable(joined)
}

fn into_fetchable(mut url: Url) -> Result<Url, UrlError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::InvalidUrl("missing host".into()));
    }

    url.set_fragment(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let url = parse_fetch_url("https://www.heise.de/newsticker/heise.rdf").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("www.heise.de"));
        assert_eq!(url.path(), "/newsticker/heise.rdf");
    }

    #[test]
    fn test_parse_requires_scheme() {
        let result = parse_fetch_url("example.com/feed");
        assert!(matches!(result, Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_remove_fragment() {
        let url = parse_fetch_url("https://example.com/article#comments").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/article");
    }

    #[test]
    fn test_parse_preserve_query() {
        let url = parse_fetch_url("https://example.com/?a=1&b=2").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_parse_trim_whitespace() {
        let url = parse_fetch_url("  http://example.com  ").unwrap();
        assert_eq!(url.as_str(), "http://example.com/");
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        let result = parse_fetch_url("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));

        let result = parse_fetch_url("ftp://example.com/feed.xml");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse_fetch_url(""), Err(UrlError::Empty)));
        assert!(matches!(parse_fetch_url("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_absolute_location() {
        let base = Url::parse("http://example.com/a").unwrap();
        let next = resolve_location(&base, "https://mirror.example.org/b").unwrap();
        assert_eq!(next.as_str(), "https://mirror.example.org/b");
    }

    #[test]
    fn test_resolve_relative_location() {
        let base = Url::parse("https://example.com/news/item?id=1").unwrap();

        let next = resolve_location(&base, "/print/item").unwrap();
        assert_eq!(next.as_str(), "https://example.com/print/item");

        let next = resolve_location(&base, "other").unwrap();
        assert_eq!(next.as_str(), "https://example.com/news/other");
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        let base = Url::parse("https://example.com/").unwrap();
        let result = resolve_location(&base, "javascript:alert(1)");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty_location() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(matches!(resolve_location(&base, " "), Err(UrlError::Empty)));
    }
}
