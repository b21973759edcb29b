//! Text Completion Provider Abstraction
//!
//! Defines the `CompletionClient` trait: "given a system instruction and a
//! user message, return generated text". Every agent in the pipeline talks to
//! the model through this boundary and never sees the wire protocol.
//!
//! ## Backends
//!
//! - `gemini`: Google Generative Language `generateContent`
//! - `openai`: OpenAI-compatible chat completions
//! - `ollama`: locally running Ollama server

mod gemini;
#[cfg(test)]
pub(crate) mod mock;
mod ollama;
mod openai;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

pub use crate::types::{CompletionCategory, CompletionError, ErrorClassifier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::{ReportError, Result};

// =============================================================================
// Request / Response
// =============================================================================

/// One text-completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Fixed instruction text for the calling stage
    pub system_instruction: String,
    /// Per-call content (findings, combined findings text, raw input)
    pub user_content: String,
    /// Overrides the client's configured output limit
    pub max_output_tokens: Option<u32>,
    /// Overrides the client's configured temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(system_instruction: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_content: user_content.into(),
            max_output_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Generated text plus usage metrics
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text, untrimmed
    pub text: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl Completion {
    /// Create a completion with text only (usage unknown)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared client, constructed once and injected into every stage.
pub type SharedClient = Arc<dyn CompletionClient + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for completion providers
///
/// API keys are never serialized and are redacted in debug output. Each
/// provider converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "gemini", "openai", "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Default sampling temperature
    pub temperature: f32,
    /// API key; falls back to the provider's environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Default maximum output tokens
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            timeout_secs: 60,
            temperature: 0.0,
            api_key: None,
            api_base: None,
            max_tokens: 2000,
        }
    }
}

// =============================================================================
// Completion Client Trait
// =============================================================================

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion.
    ///
    /// Fails with `CompletionError` on network, auth, quota, timeout or
    /// malformed-reply conditions. No retries are attempted.
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is reachable and configured
    async fn health_check(&self) -> bool;
}

/// Create a shared client from configuration
pub fn create_client(config: &ProviderConfig) -> Result<SharedClient> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(ReportError::Config(format!(
            "Unknown provider: {}. Supported: gemini, openai, ollama",
            config.provider
        ))),
    }
}

/// Turn a non-success HTTP response into a classified error
pub(crate) async fn status_error(response: reqwest::Response, provider: &str) -> CompletionError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ErrorClassifier::classify_http_status(
        status.as_u16(),
        &format!("API error ({}): {}", status, body),
        provider,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_provider_config_never_serializes_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ProviderConfig {
            provider: "claude-code".to_string(),
            ..Default::default()
        };
        let err = create_client(&config).err().expect("should fail");
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new("sys", "user")
            .with_max_output_tokens(500)
            .with_temperature(0.2);
        assert_eq!(req.max_output_tokens, Some(500));
        assert_eq!(req.temperature, Some(0.2));
    }
}
