//! Fake LLM provider for tests and offline development.
//!
//! Responses are picked by checking whether any message in the request
//! contains a registered substring (case-insensitive), so tests run without
//! network access or API costs.

use super::{ChatRequest, ChatResponse, LlmError, LlmProvider, Usage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug)]
pub struct FakeProvider {
    rules: Vec<(String, Reply)>,
    default_reply: Option<Reply>,
    calls: AtomicUsize,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: Some(Reply::Text("{}".to_string())),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeProvider {
    /// A provider with no rules and no default; every call fails.
    pub fn new() -> Self {
        Self {
            default_reply: None,
            ..Self::default()
        }
    }

    /// Reply with `response` when the request mentions `prompt_contains`.
    pub fn with_response(mut self, prompt_contains: &str, response: &str) -> Self {
        self.rules.push((
            prompt_contains.to_lowercase(),
            Reply::Text(response.to_string()),
        ));
        self
    }

    /// Fail with an API error when the request mentions `prompt_contains`.
    pub fn with_error(mut self, prompt_contains: &str, message: &str) -> Self {
        self.rules.push((
            prompt_contains.to_lowercase(),
            Reply::Fail(message.to_string()),
        ));
        self
    }

    /// Reply used when no rule matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_reply = Some(Reply::Text(response.to_string()));
        self
    }

    /// Number of completed calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");

        let reply = self
            .rules
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.default_reply.clone());

        match reply {
            Some(Reply::Text(content)) => Ok(ChatResponse {
                usage: Some(Usage {
                    prompt_tokens: prompt.len() as u32 / 4,
                    completion_tokens: content.len() as u32 / 4,
                    total_tokens: (prompt.len() + content.len()) as u32 / 4,
                }),
                content,
                model: self.model_name().to_string(),
            }),
            Some(Reply::Fail(message)) => Err(LlmError::ApiError {
                status: 500,
                message,
            }),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: no response configured for prompt (first 100 chars): {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn ask(text: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::system("be terse"), ChatMessage::user(text)],
            ..ChatRequest::default()
        }
    }

    #[tokio::test]
    async fn test_matches_case_insensitively() {
        let provider = FakeProvider::new().with_response("HELLO", "world");
        let response = provider.complete(ask("hello there")).await.unwrap();
        assert_eq!(response.content, "world");
        assert_eq!(response.model, "fake-model");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_match_without_default_fails() {
        let provider = FakeProvider::new();
        assert!(provider.complete(ask("anything")).await.is_err());
    }

    #[tokio::test]
    async fn test_default_response() {
        let provider = FakeProvider::new().with_default_response("fallback");
        let response = provider.complete(ask("random prompt")).await.unwrap();
        assert_eq!(response.content, "fallback");
    }

    #[tokio::test]
    async fn test_configured_error() {
        let provider = FakeProvider::default().with_error("boom", "exploded");
        let err = provider.complete(ask("go boom")).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 500, .. }));
    }
}
