//! OpenAI API Provider
//!
//! Completion client for OpenAI-compatible Chat Completions endpoints.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    Completion, CompletionClient, CompletionError, CompletionRequest, ErrorClassifier,
    ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage, status_error,
};
use crate::types::{ReportError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const PROVIDER: &str = "openai";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ReportError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_instruction.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_content.clone(),
                },
            ],
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: Some(request.max_output_tokens.unwrap_or(self.max_tokens)),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError> {
        info!(
            "Generating with OpenAI (model: {}, temperature: {})",
            self.model,
            request.temperature.unwrap_or(self.temperature)
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.api_base);

        debug!("Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            return Err(status_error(response, PROVIDER).await);
        }

        let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
            CompletionError::malformed(format!("Failed to parse OpenAI response: {}", e))
                .provider(PROVIDER)
        })?;

        let usage = response_body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let text = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                CompletionError::malformed("No content in OpenAI response").provider(PROVIDER)
            })?;

        debug!("Received {} chars from OpenAI", text.len());

        Ok(Completion {
            text,
            usage,
            timing: ResponseTiming::from_duration(elapsed),
            metadata: ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                true
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                false
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig {
            provider: "openai".to_string(),
            api_key: Some("test-key".to_string()),
            api_base: Some("http://localhost:9999/v1/".to_string()),
            ..Default::default()
        })
        .expect("provider")
    }

    #[test]
    fn test_build_request_uses_overrides() {
        let p = provider();
        let req = CompletionRequest::new("You are a radiologist.", "Liver: NP")
            .with_max_output_tokens(256)
            .with_temperature(0.3);
        let body = p.build_request(&req);

        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages[1].content, "Liver: NP");
        assert_eq!(body.max_tokens, Some(256));
        assert!((body.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        assert_eq!(provider().api_base, "http://localhost:9999/v1");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{"choices":[{"message":{"content":"The liver is normal."}}],
                       "usage":{"prompt_tokens":40,"completion_tokens":6}}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("The liver is normal.")
        );
        assert_eq!(parsed.usage.map(|u| u.prompt_tokens), Some(40));
    }
}
