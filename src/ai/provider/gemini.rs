//! Google Gemini Provider
//!
//! Completion client for the Generative Language API (`models/*:generateContent`).

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

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const PROVIDER: &str = "gemini";

/// Gemini provider; the key travels in the `x-goog-api-key` header, never in the URL.
pub struct GeminiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                ReportError::Config(
                    "Gemini API key not found. Set GOOGLE_API_KEY env var or provide in config"
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

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.api_base, self.model)
    }

    fn build_request(&self, request: &CompletionRequest) -> GenerateContentRequest {
        let system_instruction = (!request.system_instruction.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part {
                text: request.system_instruction.clone(),
            }],
        });

        GenerateContentRequest {
            system_instruction,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.user_content.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(self.temperature),
                max_output_tokens: request.max_output_tokens.unwrap_or(self.max_tokens),
            },
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn candidate_text(
        response: GenerateContentResponse,
    ) -> std::result::Result<(String, TokenUsage), CompletionError> {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(CompletionError::with_provider(
                super::CompletionCategory::BadRequest,
                format!("Prompt blocked by safety filter: {}", reason),
                PROVIDER,
            ));
        }

        let usage = response
            .usage_metadata
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            CompletionError::malformed("No candidates in Gemini response").provider(PROVIDER)
        })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CompletionError::malformed(format!(
                "Empty response from Gemini (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
            .provider(PROVIDER));
        }

        Ok((text, usage))
    }
}

#[async_trait]
impl CompletionClient for GeminiProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError> {
        info!(
            "Generating with Gemini (model: {}, temperature: {})",
            self.model,
            request.temperature.unwrap_or(self.temperature)
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}:generateContent", self.model_url());

        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            return Err(status_error(response, PROVIDER).await);
        }

        let response_body: GenerateContentResponse = response.json().await.map_err(|e| {
            CompletionError::malformed(format!("Failed to parse Gemini response: {}", e))
                .provider(PROVIDER)
        })?;

        let (text, usage) = Self::candidate_text(response_body)?;
        debug!("Received {} chars from Gemini", text.len());

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
        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("Gemini API is available with model: {}", self.model);
                true
            }
            Ok(resp) => {
                warn!("Gemini API check failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!("Gemini API check failed: {}", e);
                false
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompletionCategory;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(ProviderConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        })
        .expect("provider")
    }

    #[test]
    fn test_request_shape() {
        let body = provider().build_request(&CompletionRequest::new(
            "You are a radiologist.",
            "Findings: NP",
        ));
        let json = serde_json::to_value(&body).expect("serialize");

        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a radiologist."
        );
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Findings: NP");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2000);
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_empty_system_instruction_omitted() {
        let body = provider().build_request(&CompletionRequest::new("", "x"));
        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "The spleen "}, {"text": "is normal."}]},
                            "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5}
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).expect("parse");
        let (text, usage) = GeminiProvider::candidate_text(parsed).expect("text");
        assert_eq!(text, "The spleen is normal.");
        assert_eq!(usage.total(), 17);
    }

    #[test]
    fn test_candidate_text_empty_is_malformed() {
        let raw = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).expect("parse");
        let err = GeminiProvider::candidate_text(parsed).expect_err("should fail");
        assert_eq!(err.category, CompletionCategory::MalformedResponse);
        assert!(err.message.contains("MAX_TOKENS"));
    }

    #[test]
    fn test_blocked_prompt() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).expect("parse");
        let err = GeminiProvider::candidate_text(parsed).expect_err("should fail");
        assert_eq!(err.category, CompletionCategory::BadRequest);
    }
}
