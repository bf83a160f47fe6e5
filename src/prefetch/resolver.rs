//! Prefetch path resolution.
//!
//! # Responsibilities
//! - Capture scheme, host, path and raw query of the inbound request
//! - Turn one hint into an absolute URL on the same host
//!
//! # Design Decisions
//! - `/`-prefixed hints resolve against the host root
//! - Other hints resolve against the directory of the inbound path
//! - The query always comes from the inbound request, byte for byte; a hint only names a path
//! - Paths are normalized by `url`: `\` becomes `/` and dot segments collapse
//! - A hint that cannot become a URL is reported, the caller skips it

use axum::http::uri::InvalidUri;
use axum::http::{header, request::Parts, Uri};
use thiserror::Error;
use url::Url;

/// Why a hint could not be turned into a URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("empty prefetch hint")]
    EmptyHint,

    #[error("prefetch path parse error: {candidate}: {source}")]
    Malformed {
        candidate: String,
        #[source]
        source: url::ParseError,
    },

    #[error("prefetch target is not a valid request URI: {candidate}: {source}")]
    InvalidUri {
        candidate: String,
        #[source]
        source: InvalidUri,
    },
}

/// The parts of the inbound request that prefetch URLs are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    scheme: String,
    host: String,
    path: String,
    query: Option<String>,
}

impl RequestTarget {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        query: Option<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query,
        }
    }

    /// Capture the target of an inbound request.
    ///
    /// Scheme and host come from the URI when it is in absolute form, otherwise
    /// from `default_scheme` and the `Host` header. `fallback_host` covers
    /// HTTP/1.0 clients that send neither.
    pub fn from_parts(parts: &Parts, default_scheme: &str, fallback_host: &str) -> Self {
        let scheme = parts
            .uri
            .scheme_str()
            .unwrap_or(default_scheme)
            .to_string();

        let host = parts
            .uri
            .authority()
            .map(|authority| authority.as_str().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(header::HOST)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| fallback_host.to_string());

        Self {
            scheme,
            host,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The inbound path with its final segment removed.
    ///
    /// `/videos/main.m3u8` gives `/videos`, `/main.m3u8` and `/` give `/`.
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => {
                let dir = self.path[..idx].trim_end_matches('/');
                if dir.is_empty() {
                    "/"
                } else {
                    dir
                }
            }
            None => "/",
        }
    }

    /// Resolve a single trimmed hint into an absolute request URI.
    ///
    /// The hint's own query and fragment are dropped and the inbound raw query
    /// is appended unchanged, so signed tokens survive without re-encoding.
    pub fn resolve(&self, hint: &str) -> Result<Uri, ResolveError> {
        if hint.is_empty() {
            return Err(ResolveError::EmptyHint);
        }

        let candidate = if hint.starts_with('/') {
            format!("{}://{}{}", self.scheme, self.host, hint)
        } else {
            match self.directory() {
                "/" => format!("{}://{}/{}", self.scheme, self.host, hint),
                dir => format!("{}://{}{}/{}", self.scheme, self.host, dir, hint),
            }
        };

        let mut url = match Url::parse(&candidate) {
            Ok(url) => url,
            Err(source) => return Err(ResolveError::Malformed { candidate, source }),
        };
        url.set_query(None);
        url.set_fragment(None);

        let mut target = String::from(url);
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }

        target
            .parse::<Uri>()
            .map_err(|source| ResolveError::InvalidUri { candidate: target.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn playlist() -> RequestTarget {
        RequestTarget::new(
            "https",
            "example.com",
            "/videos/main.m3u8",
            Some("token=abc".into()),
        )
    }

    #[test]
    fn absolute_hint_resolves_against_host() {
        let url = playlist().resolve("/images/x.jpg").unwrap();
        assert_eq!(url.to_string(), "https://example.com/images/x.jpg?token=abc");
    }

    #[test]
    fn relative_hint_resolves_against_directory() {
        let url = playlist().resolve("chunk2.ts").unwrap();
        assert_eq!(url.to_string(), "https://example.com/videos/chunk2.ts?token=abc");
    }

    #[test]
    fn relative_hint_with_subdirectory() {
        let url = playlist().resolve("720p/chunk2.ts").unwrap();
        assert_eq!(url.to_string(), "https://example.com/videos/720p/chunk2.ts?token=abc");
    }

    #[test]
    fn resolution_is_repeatable() {
        let target = playlist();
        assert_eq!(
            target.resolve("/images/x.jpg").unwrap(),
            target.resolve("/images/x.jpg").unwrap()
        );
    }

    #[test]
    fn hint_query_is_replaced_by_inbound_query() {
        let url = playlist().resolve("/images/x.jpg?size=large#top").unwrap();
        assert_eq!(url.to_string(), "https://example.com/images/x.jpg?token=abc");
    }

    #[test]
    fn hint_query_is_dropped_without_inbound_query() {
        let target = RequestTarget::new("http", "cdn.test:8080", "/live/index.m3u8", None);
        let url = target.resolve("seg.ts?x=1").unwrap();
        assert_eq!(url.to_string(), "http://cdn.test:8080/live/seg.ts");
    }

    #[test]
    fn root_level_request_does_not_double_slash() {
        let target = RequestTarget::new("https", "example.com", "/main.m3u8", None);
        assert_eq!(target.directory(), "/");
        assert_eq!(
            target.resolve("chunk1.ts").unwrap().to_string(),
            "https://example.com/chunk1.ts"
        );
    }

    #[test]
    fn directory_of_trailing_slash_path() {
        let target = RequestTarget::new("https", "example.com", "/videos/", None);
        assert_eq!(target.directory(), "/videos");
    }

    #[test]
    fn absolute_hint_cannot_change_host() {
        let url = playlist().resolve("//evil.test/x.ts").unwrap();
        assert_eq!(url.host(), Some("example.com"));
    }

    #[test]
    fn empty_hint_is_rejected() {
        assert!(matches!(playlist().resolve(""), Err(ResolveError::EmptyHint)));
    }

    #[test]
    fn malformed_url_is_reported() {
        let target = RequestTarget::new("https", "exa mple.com", "/a/b", None);
        let err = target.resolve("/x.ts").unwrap_err();
        match err {
            ResolveError::Malformed { candidate, .. } => {
                assert_eq!(candidate, "https://exa mple.com/x.ts");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_parts_uses_host_header_for_origin_form() {
        let (parts, _) = Request::builder()
            .uri("/videos/main.m3u8?token=abc")
            .header("host", "media.example.com")
            .body(())
            .unwrap()
            .into_parts();

        let target = RequestTarget::from_parts(&parts, "https", "origin:3000");
        assert_eq!(
            target,
            RequestTarget::new("https", "media.example.com", "/videos/main.m3u8", Some("token=abc".into()))
        );
    }

    #[test]
    fn from_parts_prefers_absolute_uri() {
        let (parts, _) = Request::builder()
            .uri("http://edge.test/a/b.ts")
            .header("host", "ignored.test")
            .body(())
            .unwrap()
            .into_parts();

        let target = RequestTarget::from_parts(&parts, "https", "origin:3000");
        assert_eq!(target.host(), "edge.test");
        assert_eq!(target.resolve("c.ts").unwrap().to_string(), "http://edge.test/a/c.ts");
    }

    #[test]
    fn from_parts_falls_back_without_host() {
        let (parts, _) = Request::builder().uri("/x").body(()).unwrap().into_parts();
        let target = RequestTarget::from_parts(&parts, "http", "origin:3000");
        assert_eq!(target.host(), "origin:3000");
        assert_eq!(target, RequestTarget::new("http", "origin:3000", "/x", None));
    }

    #[test]
    fn inbound_query_is_copied_without_re_encoding() {
        let (parts, _) = Request::builder()
            .uri("/videos/main.m3u8?sig='abc'&exp=1%2F2")
            .header("host", "example.com")
            .body(())
            .unwrap()
            .into_parts();

        let target = RequestTarget::from_parts(&parts, "https", "origin:3000");
        let uri = target.resolve("chunk.ts").unwrap();
        assert_eq!(uri.to_string(), "https://example.com/videos/chunk.ts?sig='abc'&exp=1%2F2");
        assert_eq!(uri.query(), Some("sig='abc'&exp=1%2F2"));
    }

    #[test]
    fn empty_inbound_query_adds_no_question_mark() {
        let (parts, _) = Request::builder()
            .uri("/videos/main.m3u8?")
            .header("host", "example.com")
            .body(())
            .unwrap()
            .into_parts();

        let target = RequestTarget::from_parts(&parts, "https", "origin:3000");
        assert_eq!(
            target.resolve("chunk.ts").unwrap().to_string(),
            "https://example.com/videos/chunk.ts"
        );
    }

    #[test]
    fn paths_are_normalized() {
        let target = playlist();
        assert_eq!(
            target.resolve("../audio/a.ts").unwrap().path(),
            "/audio/a.ts"
        );
        assert_eq!(
            target.resolve("dir\\f.ts").unwrap().path(),
            "/videos/dir/f.ts"
        );
    }
}
