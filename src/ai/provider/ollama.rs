//! Ollama Local LLM Provider
//!
//! Completion client for locally-running Ollama models.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    Completion, CompletionCategory, CompletionClient, CompletionError, CompletionRequest,
    ErrorClassifier, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage, status_error,
};
use crate::types::{ReportError, Result, estimate_tokens};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3:latest";
const PROVIDER: &str = "ollama";

/// Ollama Local LLM Provider
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let api_base = Self::validate_endpoint(&api_base)?;

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Only http/https endpoints are accepted; non-localhost hosts are logged.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            ReportError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReportError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Findings text will leave this machine.",
                host
            );
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn build_request(&self, request: &CompletionRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            system: request.system_instruction.clone(),
            prompt: request.user_content.clone(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature.unwrap_or(self.temperature),
                num_predict: request.max_output_tokens.unwrap_or(self.max_tokens),
            },
        }
    }
}

#[async_trait]
impl CompletionClient for OllamaProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError> {
        info!(
            "Generating with Ollama (model: {}, temperature: {})",
            self.model,
            request.temperature.unwrap_or(self.temperature)
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}/api/generate", self.api_base);

        debug!("Sending request to Ollama API");

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                CompletionError::with_provider(
                    CompletionCategory::Network,
                    format!(
                        "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                        self.api_base
                    ),
                    PROVIDER,
                )
            } else {
                ErrorClassifier::classify_transport(&e, PROVIDER)
            }
        })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            return Err(status_error(response, PROVIDER).await);
        }

        let response_body: OllamaResponse = response.json().await.map_err(|e| {
            CompletionError::malformed(format!("Failed to parse Ollama response: {}", e))
                .provider(PROVIDER)
        })?;

        // Older Ollama builds omit eval counts; estimate so usage stays meaningful.
        let usage = TokenUsage::new(
            response_body.prompt_eval_count.unwrap_or_else(|| {
                estimate_tokens(&format!("{}{}", body.system, body.prompt)) as u32
            }),
            response_body
                .eval_count
                .unwrap_or_else(|| estimate_tokens(&response_body.response) as u32),
        );

        Ok(Completion {
            text: response_body.response,
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
        let url = format!("{}/api/tags", self.api_base);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(tags) = resp.json::<OllamaTagsResponse>().await {
                    let model_available = tags.models.iter().any(|m| {
                        m.name == self.model
                            || m.name.starts_with(&self.model.replace(":latest", ""))
                    });

                    if model_available {
                        info!("Ollama is available with model: {}", self.model);
                        true
                    } else {
                        warn!(
                            "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                            self.model, self.model
                        );
                        false
                    }
                } else {
                    info!("Ollama is available");
                    true
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                false
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProviderConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };

        let provider = OllamaProvider::new(config).expect("Failed to create provider");
        assert_eq!(provider.api_base, DEFAULT_API_BASE);
        assert_eq!(provider.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let config = ProviderConfig {
            provider: "ollama".to_string(),
            api_base: Some("file:///etc/passwd".to_string()),
            ..Default::default()
        };
        assert!(OllamaProvider::new(config).is_err());
    }

    #[test]
    fn test_build_request_carries_system_and_limits() {
        let provider = OllamaProvider::new(ProviderConfig {
            provider: "ollama".to_string(),
            max_tokens: 800,
            ..Default::default()
        })
        .expect("provider");

        let body = provider.build_request(&CompletionRequest::new("sys", "Spleen: 14cm"));
        assert_eq!(body.system, "sys");
        assert_eq!(body.prompt, "Spleen: 14cm");
        assert_eq!(body.options.num_predict, 800);
        assert!(!body.stream);
    }
}
