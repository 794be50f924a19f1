//! HTTP client trait and implementations.

use async_trait::async_trait;
use encoding_rs::Encoding;
use reqwest::redirect;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;

use super::rate_limiter::RateLimiter;
use super::HostAllowlist;

/// Browser-like user agent; many recipe sites refuse obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch a page as text.
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch binary content (images) as raw bytes.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Configuration for [`ReqwestClient`].
#[derive(Debug, Clone)]
pub struct ReqwestClientBuilder {
    allowlist: HostAllowlist,
    rate_limit_ms: u64,
    timeout: Duration,
    user_agent: String,
    max_bytes: usize,
}

impl Default for ReqwestClientBuilder {
    fn default() -> Self {
        Self {
            allowlist: HostAllowlist::any(),
            rate_limit_ms: 200,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ReqwestClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict which hosts may be contacted.
    pub fn allowlist(mut self, allowlist: HostAllowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Set the delay between requests to the same host. 0 disables rate limiting.
    pub fn rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Responses larger than this are rejected with [`FetchError::TooLarge`].
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn build(self) -> Result<ReqwestClient, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .redirect(redirect_policy(self.allowlist.clone()))
            .build()?;

        Ok(ReqwestClient {
            inner,
            allowlist: self.allowlist,
            rate_limiter: RateLimiter::new(Duration::from_millis(self.rate_limit_ms)),
            max_bytes: self.max_bytes,
        })
    }
}

/// Every redirect target must pass the allow-list too.
fn redirect_policy(allowlist: HostAllowlist) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(FetchError::Other(format!(
                "Too many redirects (max {})",
                MAX_REDIRECTS
            )));
        }
        match allowlist.check(attempt.url().as_str()) {
            Ok(_) => attempt.follow(),
            Err(e) => attempt.error(e),
        }
    })
}

/// Surface the policy's own error instead of reqwest's wrapper.
fn request_error(e: reqwest::Error) -> FetchError {
    if e.is_redirect() {
        let mut source = std::error::Error::source(&e);
        while let Some(err) = source {
            if let Some(fetch) = err.downcast_ref::<FetchError>() {
                return match fetch {
                    FetchError::HostNotAllowed(host) => FetchError::HostNotAllowed(host.clone()),
                    FetchError::InvalidUrl(msg) => FetchError::InvalidUrl(msg.clone()),
                    other => FetchError::Other(other.to_string()),
                };
            }
            source = err.source();
        }
    }
    FetchError::RequestFailed(e)
}

/// Decode a page using the Content-Type charset, falling back to lossy UTF-8.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|ct| {
            let lower = ct.to_ascii_lowercase();
            let label = lower
                .split("charset=")
                .nth(1)?
                .trim_start_matches('"')
                .split(['"', ';', ',', ' '])
                .next()?
                .trim()
                .to_string();
            Encoding::for_label(label.as_bytes())
        })
        .filter(|e| *e != encoding_rs::UTF_8);

    match encoding {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Production HTTP client: allow-list, per-host rate limiting and a size cap.
pub struct ReqwestClient {
    inner: reqwest::Client,
    allowlist: HostAllowlist,
    rate_limiter: RateLimiter,
    max_bytes: usize,
}

impl ReqwestClient {
    pub fn builder() -> ReqwestClientBuilder {
        ReqwestClientBuilder::new()
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let parsed = self.allowlist.check(url)?;

        if let Some(host) = parsed.host_str() {
            self.rate_limiter.wait(host).await;
        }

        tracing::debug!(url, "network: fetching");
        let response = self.inner.get(parsed).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = %status, "network: request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size: len as usize,
                    max: self.max_bytes,
                });
            }
        }

        Ok(response)
    }

    /// Read the body in chunks, stopping as soon as it passes the size cap.
    async fn read_capped(&self, mut response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size: body.len() + chunk.len(),
                    max: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self.send(url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = self.read_capped(response).await?;
        Ok(decode_body(&bytes, content_type.as_deref()))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.send(url).await?;
        self.read_capped(response).await
    }
}

/// Mock response for testing.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Html(String),
    Bytes(Vec<u8>),
    Status(u16),
    Error(String),
}

/// Mock HTTP client for testing. Records every requested URL.
#[derive(Default)]
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn with_html(self, url: &str, html: &str) -> Self {
        self.with_response(url, MockResponse::Html(html.to_string()))
    }

    pub fn with_bytes(self, url: &str, bytes: Vec<u8>) -> Self {
        self.with_response(url, MockResponse::Bytes(bytes))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    pub fn with_error(self, url: &str, error: &str) -> Self {
        self.with_response(url, MockResponse::Error(error.to_string()))
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn lookup(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        match self.responses.get(url) {
            Some(MockResponse::Html(html)) => Ok(html.as_bytes().to_vec()),
            Some(MockResponse::Bytes(bytes)) => Ok(bytes.clone()),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            }),
            Some(MockResponse::Error(e)) => Err(FetchError::Other(e.clone())),
            None => Err(FetchError::Other(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.lookup(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.lookup(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_records_requests() {
        let client = MockClient::new()
            .with_html("https://a.test/r", "<p>hi</p>")
            .with_status("https://a.test/missing", 404);

        assert_eq!(
            client.fetch_html("https://a.test/r").await.unwrap(),
            "<p>hi</p>"
        );
        let err = client.fetch_bytes("https://a.test/missing").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(client.fetch_html("https://a.test/unknown").await.is_err());

        assert_eq!(
            client.requests(),
            vec![
                "https://a.test/r",
                "https://a.test/missing",
                "https://a.test/unknown"
            ]
        );
    }

    #[tokio::test]
    async fn test_reqwest_client_enforces_allowlist_before_network() {
        let client = ReqwestClient::builder()
            .allowlist(HostAllowlist::only(["allowed.test"]))
            .build()
            .unwrap();

        let err = client
            .fetch_html("https://blocked.test/recipe")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HostNotAllowed(h) if h == "blocked.test"));
    }

    /// Answer each connection with the next canned response.
    async fn serve(responses: Vec<String>) -> u16 {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        port
    }

    fn redirect_to(location: &str) -> String {
        format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            location
        )
    }

    fn page(body: &str, extra_headers: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\n{}Connection: close\r\n\r\n{}",
            extra_headers, body
        )
    }

    fn local_client(hosts: &[String]) -> ReqwestClient {
        ReqwestClient::builder()
            .allowlist(HostAllowlist::only(hosts))
            .rate_limit_ms(0)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_redirect_to_disallowed_host_is_refused() {
        let internal = serve(vec![page("INTERNAL-ADMIN", "Content-Length: 14\r\n")]).await;
        let internal_url = format!("http://localhost:{}/admin", internal);
        let front = serve(vec![redirect_to(&internal_url)]).await;

        let client = local_client(&[format!("127.0.0.1:{}", front)]);
        let err = client
            .fetch_html(&format!("http://127.0.0.1:{}/recipe", front))
            .await
            .unwrap_err();

        assert!(
            matches!(
                &err,
                FetchError::HostNotAllowed(h) if *h == format!("localhost:{}", internal)
            ),
            "unexpected error: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_redirect_within_allowlist_is_followed() {
        let front = serve(vec![
            redirect_to("/final"),
            page("<p>soup</p>", "Content-Length: 11\r\n"),
        ])
        .await;

        let client = local_client(&[format!("127.0.0.1:{}", front)]);
        let html = client
            .fetch_html(&format!("http://127.0.0.1:{}/start", front))
            .await
            .unwrap();
        assert_eq!(html, "<p>soup</p>");
    }

    #[tokio::test]
    async fn test_body_without_length_is_capped() {
        let body = "x".repeat(4096);
        let port = serve(vec![page(&body, "")]).await;

        let client = ReqwestClient::builder()
            .rate_limit_ms(0)
            .max_bytes(1024)
            .build()
            .unwrap();
        let err = client
            .fetch_bytes(&format!("http://127.0.0.1:{}/big.jpg", port))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { max: 1024, .. }));
    }

    #[test]
    fn test_decode_body_uses_declared_charset() {
        assert_eq!(
            decode_body(b"caf\xe9", Some("text/html; charset=ISO-8859-1")),
            "café"
        );
        assert_eq!(decode_body("café".as_bytes(), Some("text/html")), "café");
        assert_eq!(decode_body(b"caf\xe9", None), "caf\u{fffd}");
    }
}
