//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (`$XDG_CONFIG_HOME/radreport/`) and project (`.radreport/`)
//! level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ai::ProviderConfig;
use crate::constants::{batch as batch_constants, llm as llm_constants};
use crate::types::{ReportError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Completion provider settings
    pub llm: LlmConfig,

    /// Report pipeline behaviour
    pub pipeline: PipelineConfig,

    /// Report file output
    pub output: OutputConfig,

    /// Batch processing
    pub batch: BatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            output: OutputConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ReportError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ReportError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(ReportError::Config(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.batch.max_concurrent_patients == 0 {
            return Err(ReportError::Config(
                "batch max_concurrent_patients must be greater than 0".to_string(),
            ));
        }

        if self.output.batch_filename_template.trim().is_empty() {
            return Err(ReportError::Config(
                "output batch_filename_template must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: gemini, openai, ollama
    pub provider: String,

    /// Model name; the provider's default when unset
    pub model: Option<String>,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature (0.0 keeps terminology consistent)
    pub temperature: f32,

    /// Maximum output tokens per call
    pub max_tokens: u32,

    /// API key; falls back to GOOGLE_API_KEY / OPENAI_API_KEY.
    /// Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Custom endpoint
    pub api_base: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: llm_constants::DEFAULT_PROVIDER.to_string(),
            model: None,
            timeout_secs: llm_constants::DEFAULT_TIMEOUT_SECS,
            temperature: llm_constants::DEFAULT_TEMPERATURE,
            max_tokens: llm_constants::DEFAULT_MAX_TOKENS,
            api_key: None,
            api_base: None,
        }
    }
}

impl LlmConfig {
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            max_tokens: self.max_tokens,
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// How raw findings are split into organ fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Local heading-delimited parsing
    #[default]
    Heading,
    /// Model-backed JSON splitter
    Llm,
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractorKind::Heading => write!(f, "heading"),
            ExtractorKind::Llm => write!(f, "llm"),
        }
    }
}

impl std::str::FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "heading" => Ok(ExtractorKind::Heading),
            "llm" => Ok(ExtractorKind::Llm),
            _ => Err(format!(
                "Unknown extractor: {}. Valid values: heading, llm",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Field extractor implementation
    pub extractor: ExtractorKind,

    /// Issue the six fixed-organ calls concurrently
    pub parallel_organs: bool,

    /// Answer empty/NP findings with the fixed normal sentence, without a call
    pub short_circuit_normal: bool,

    /// Leave out fixed organs that have no heading in the input
    pub omit_unreported_organs: bool,

    /// Additional headings recognised as extra organs
    pub extra_headings: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::Heading,
            parallel_organs: true,
            short_circuit_normal: true,
            omit_unreported_organs: false,
            extra_headings: Vec::new(),
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory batch documents are written to
    pub output_dir: PathBuf,

    /// Batch file name; `{date}` is replaced with the batch date
    pub batch_filename_template: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            batch_filename_template: batch_constants::DEFAULT_FILENAME_TEMPLATE.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn batch_filename(&self, date: &str) -> String {
        self.batch_filename_template.replace("{date}", date)
    }
}

// =============================================================================
// Batch Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Patients processed at the same time
    pub max_concurrent_patients: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_patients: batch_constants::DEFAULT_MAX_CONCURRENT_PATIENTS,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.max_tokens, 2000);
        assert!(config.pipeline.parallel_organs);
        assert!(config.pipeline.short_circuit_normal);
        assert!(!config.pipeline.omit_unreported_organs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extractor_kind() {
        assert_eq!(ExtractorKind::Heading.to_string(), "heading");
        assert_eq!("LLM".parse::<ExtractorKind>().unwrap(), ExtractorKind::Llm);
        assert!("regex".parse::<ExtractorKind>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.batch.max_concurrent_patients = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_filename() {
        let output = OutputConfig::default();
        assert_eq!(
            output.batch_filename("2025-01-31"),
            "radiology_reports_2025-01-31.txt"
        );
    }

    #[test]
    fn test_api_key_not_serialized_or_debugged() {
        let mut config = Config::default();
        config.llm.api_key = Some("AIza-secret".to_string());

        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(!toml.contains("AIza-secret"));
        assert!(!format!("{:?}", config).contains("AIza-secret"));
    }
}
