//! LLM provider abstraction.
//!
//! The import pipeline only depends on [`LlmProvider::complete`]: send chat
//! messages (optionally constrained by a JSON schema) and get text back.

mod fake;
pub mod openrouter;

pub use fake::FakeProvider;
pub use openrouter::{OpenRouterConfig, OpenRouterProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("OpenRouter API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Provider returned no choices")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    /// Only 429s are retried; everything else fails the call immediately.
    pub fn should_retry(&self) -> bool {
        matches!(self, LlmError::RateLimited)
    }
}

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Structured output constraint, serialized in the OpenAI-compatible shape.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: JsonValue,
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: JsonValue) -> Self {
        ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: name.into(),
                strict: true,
                schema,
            },
        }
    }
}

/// Request for a chat completion. The model comes from the provider.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: Option<ResponseFormat>,
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    /// Model that actually answered (providers may route to a fallback).
    pub model: String,
    pub usage: Option<Usage>,
}

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Provider name (e.g. "openrouter", "fake").
    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Select a provider by name. `openrouter` requires an API key.
pub fn create_provider(
    provider: &str,
    config: OpenRouterConfig,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match provider {
        "fake" => Ok(Arc::new(FakeProvider::default())),
        "openrouter" => {
            if config.api_key.trim().is_empty() {
                return Err(LlmError::NotConfigured(
                    "OPENROUTER_API_KEY not set".to_string(),
                ));
            }
            Ok(Arc::new(OpenRouterProvider::new(config)?))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unknown provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_format_wire_shape() {
        let format = ResponseFormat::json_schema("recipe_extraction", json!({"type": "object"}));
        assert_eq!(
            serde_json::to_value(&format).unwrap(),
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "recipe_extraction",
                    "strict": true,
                    "schema": {"type": "object"}
                }
            })
        );
        assert_eq!(
            serde_json::to_value(ResponseFormat::JsonObject).unwrap(),
            json!({"type": "json_object"})
        );
    }

    #[test]
    fn test_only_rate_limits_are_retried() {
        assert!(LlmError::RateLimited.should_retry());
        assert!(!LlmError::ApiError {
            status: 500,
            message: "boom".to_string()
        }
        .should_retry());
    }

    #[test]
    fn test_create_provider_requires_key() {
        let err = create_provider("openrouter", OpenRouterConfig::default()).unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
        assert!(create_provider("fake", OpenRouterConfig::default()).is_ok());
        assert!(create_provider("gpt", OpenRouterConfig::default()).is_err());
    }
}
