//! Outgoing HTTP for the import pipeline.
//!
//! Page and image downloads go through an [`HttpClient`] so the pipeline can be
//! driven by [`MockClient`] in tests. The production [`ReqwestClient`] applies
//! the host allow-list and a per-host rate limit before touching the network.

mod client;
mod rate_limiter;

pub use client::{HttpClient, MockClient, MockResponse, ReqwestClient, ReqwestClientBuilder};
pub use rate_limiter::RateLimiter;

use crate::error::FetchError;

/// Hosts the importer may contact.
///
/// `None` allows every host. Entries may carry a port (`localhost:8080`), in
/// which case they only match that port.
#[derive(Debug, Clone, Default)]
pub struct HostAllowlist {
    hosts: Option<Vec<String>>,
}

impl HostAllowlist {
    /// Allow every host.
    pub fn any() -> Self {
        Self { hosts: None }
    }

    /// Only allow the listed hosts (case-insensitive).
    pub fn only<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { hosts: Some(hosts) }
    }

    /// Parse a comma-separated list; an empty or blank value allows every host.
    pub fn parse(value: &str) -> Self {
        if value.trim().is_empty() {
            Self::any()
        } else {
            Self::only(value.split(','))
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.hosts.is_some()
    }

    /// Validate that `url` is an absolute http(s) URL whose host is allowed.
    pub fn check(&self, url: &str) -> Result<url::Url, FetchError> {
        let parsed = parse_http_url(url)?;

        let Some(allowed) = &self.hosts else {
            return Ok(parsed);
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl("No host in URL".to_string()))?
            .to_ascii_lowercase();
        let host_with_port = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };

        if allowed.iter().any(|h| *h == host_with_port || *h == host) {
            Ok(parsed)
        } else {
            Err(FetchError::HostNotAllowed(host_with_port))
        }
    }
}

/// Parse an absolute URL and require an http or https scheme.
pub fn parse_http_url(url: &str) -> Result<url::Url, FetchError> {
    let parsed = url::Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FetchError::InvalidUrl(format!(
                "Unsupported scheme: {}",
                other
            )))
        }
    }
    if parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl("No host in URL".to_string()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_allows_everything() {
        let allow = HostAllowlist::any();
        assert!(allow.check("https://example.com/recipe").is_ok());
        assert!(!allow.is_restricted());
    }

    #[test]
    fn test_restricted_hosts() {
        let allow = HostAllowlist::parse("example.com, localhost:8080");
        assert!(allow.check("https://Example.com/a").is_ok());
        assert!(allow.check("http://localhost:8080/b").is_ok());
        assert!(matches!(
            allow.check("http://localhost:9090/b"),
            Err(FetchError::HostNotAllowed(h)) if h == "localhost:9090"
        ));
        assert!(allow.check("https://other.org/").is_err());
    }

    #[test]
    fn test_blank_value_allows_everything() {
        assert!(!HostAllowlist::parse("  ").is_restricted());
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(matches!(
            parse_http_url("ftp://example.com/file"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(parse_http_url("not a url").is_err());
        assert!(parse_http_url("  https://example.com/x  ").is_ok());
    }
}
