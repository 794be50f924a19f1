//! OpenRouter chat-completions provider (OpenAI-compatible API).

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatRequest, ChatResponse, LlmError, LlmProvider, ResponseFormat, Usage};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-lite";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const MAX_RATE_LIMIT_RETRIES: usize = 3;

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub site_url: String,
    /// Sent as `X-Title`.
    pub site_name: String,
    pub timeout: Duration,
    /// First backoff delay after a 429; doubles on each retry.
    pub retry_base_delay: Duration,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            site_url: "http://localhost:3000".to_string(),
            site_name: "Cookbook".to_string(),
            timeout: Duration::from_secs(60),
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send_once(&self, body: &CompletionRequest<'_>) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.site_name)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(LlmError::RateLimited);
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(LlmError::ApiError { status, message });
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            usage: parsed.usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: &request.messages,
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: request.max_tokens,
            response_format: request.response_format.as_ref(),
        };

        (|| async { self.send_once(&body).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(self.config.retry_base_delay)
                    .with_factor(2.0)
                    .with_max_times(MAX_RATE_LIMIT_RETRIES)
                    .with_jitter(),
            )
            .when(|e: &LlmError| e.should_retry())
            .notify(|e, dur| {
                tracing::warn!(
                    "OpenRouter call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned HTTP responses in order, one per connection.
    async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), hits)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn provider(base_url: String) -> OpenRouterProvider {
        OpenRouterProvider::new(OpenRouterConfig {
            api_key: "test-key".to_string(),
            base_url,
            retry_base_delay: Duration::from_millis(5),
            ..OpenRouterConfig::default()
        })
        .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("hello")],
            ..ChatRequest::default()
        }
    }

    const OK_BODY: &str = r#"{"model":"google/gemini-2.5-flash-lite","choices":[{"message":{"content":"{\"ok\":true}"}}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#;

    #[tokio::test]
    async fn test_retries_after_rate_limit() {
        let (url, hits) = serve(vec![
            (429, r#"{"error":{"message":"slow down"}}"#.to_string()),
            (200, OK_BODY.to_string()),
        ])
        .await;

        let response = provider(url).complete(request()).await.unwrap();
        assert_eq!(response.content, r#"{"ok":true}"#);
        assert_eq!(response.usage.unwrap().total_tokens, 5);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let limited = (429, r#"{"error":{"message":"slow down"}}"#.to_string());
        let (url, hits) = serve(vec![limited; MAX_RATE_LIMIT_RETRIES + 1]).await;

        let err = provider(url).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_RATE_LIMIT_RETRIES + 1);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let (url, hits) = serve(vec![(
            500,
            r#"{"error":{"message":"upstream exploded"}}"#.to_string(),
        )])
        .await;

        let err = provider(url).complete(request()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "OpenRouter API error (500): upstream exploded"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let (url, _) = serve(vec![(200, r#"{"choices":[]}"#.to_string())]).await;
        let err = provider(url).complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }
}
