//! Unified Error Type System
//!
//! Centralized error types for the report pipeline.
//!
//! ## Taxonomy
//!
//! - **CompletionError**: the text-completion call itself failed (timeout, auth,
//!   quota, network, malformed reply). Always wrapped by the stage that made the call.
//! - **ExtractionError**: fatal for a run; no report is produced.
//! - **OrganAgentError**: recovered into a placeholder section.
//! - **ImpressionError**: recovered into a placeholder impression.
//! - **ReportError**: crate-wide error for plumbing (config, IO, batch output).

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Completion Categories
// =============================================================================

/// Failure categories for text-completion calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCategory {
    /// Call exceeded the caller-supplied timeout
    Timeout,
    /// Authentication or permission failure
    Auth,
    /// Rate limit or quota exhausted
    RateLimit,
    /// Connectivity issues
    Network,
    /// Provider returned a server error or is not reachable
    Unavailable,
    /// Request rejected as invalid
    BadRequest,
    /// Reply could not be used (empty, wrong shape, unparseable)
    MalformedResponse,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for CompletionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Auth => write!(f, "AUTH"),
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::MalformedResponse => write!(f, "MALFORMED_RESPONSE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// Completion Error
// =============================================================================

/// Failure of a single text-completion call
#[derive(Debug, Clone)]
pub struct CompletionError {
    /// Error category
    pub category: CompletionCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for CompletionError {}

impl CompletionError {
    pub fn new(category: CompletionCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: CompletionCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    /// Add provider context to existing error
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Create a timeout error
    pub fn timeout(operation: &str, duration: Duration) -> Self {
        Self::new(
            CompletionCategory::Timeout,
            format!("{} timed out after {:?}", operation, duration),
        )
    }

    /// Create a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(CompletionCategory::MalformedResponse, message)
    }

    /// Short human-readable reason used in placeholder text
    pub fn reason(&self) -> String {
        match self.category {
            CompletionCategory::Timeout => "request timed out".to_string(),
            CompletionCategory::Auth => "authentication failed".to_string(),
            CompletionCategory::RateLimit => "rate limit or quota exceeded".to_string(),
            CompletionCategory::Network => "network error".to_string(),
            CompletionCategory::Unavailable => "service unavailable".to_string(),
            CompletionCategory::BadRequest => "request rejected".to_string(),
            CompletionCategory::MalformedResponse => "malformed response".to_string(),
            CompletionCategory::Unknown => self.message.clone(),
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps provider failures onto completion categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> CompletionError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota")
            || lower.contains("resource exhausted")
        {
            return CompletionError::with_provider(CompletionCategory::RateLimit, message, provider);
        }

        if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline") {
            return CompletionError::with_provider(CompletionCategory::Timeout, message, provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            return CompletionError::with_provider(CompletionCategory::Auth, message, provider);
        }

        if lower.contains("connection")
            || lower.contains("network")
            || lower.contains("dns")
            || lower.contains("unreachable")
        {
            return CompletionError::with_provider(CompletionCategory::Network, message, provider);
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("500")
            || lower.contains("service unavailable")
            || lower.contains("internal error")
            || lower.contains("overloaded")
        {
            return CompletionError::with_provider(
                CompletionCategory::Unavailable,
                message,
                provider,
            );
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("invalid") {
            return CompletionError::with_provider(CompletionCategory::BadRequest, message, provider);
        }

        if lower.contains("parse") || lower.contains("empty response") || lower.contains("no content")
        {
            return CompletionError::with_provider(
                CompletionCategory::MalformedResponse,
                message,
                provider,
            );
        }

        CompletionError::with_provider(CompletionCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> CompletionError {
        let category = match status {
            429 => CompletionCategory::RateLimit,
            401 | 403 => CompletionCategory::Auth,
            400 | 404 | 422 => CompletionCategory::BadRequest,
            408 | 504 => CompletionCategory::Timeout,
            500..=599 => CompletionCategory::Unavailable,
            _ => CompletionCategory::Unknown,
        };
        CompletionError::with_provider(category, message, provider)
    }

    /// Classify a transport-level reqwest failure
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> CompletionError {
        let category = if err.is_timeout() {
            CompletionCategory::Timeout
        } else if err.is_connect() {
            CompletionCategory::Network
        } else if err.is_decode() || err.is_body() {
            CompletionCategory::MalformedResponse
        } else {
            return Self::classify(&err.to_string(), provider);
        };
        CompletionError::with_provider(category, err.to_string(), provider)
    }
}

// =============================================================================
// Stage Errors
// =============================================================================

/// Why extraction failed
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("input is empty")]
    EmptyInput,

    #[error("no organ headings recognised in input")]
    NoHeadings,

    #[error("splitter call failed: {0}")]
    Completion(CompletionError),

    #[error("splitter reply could not be parsed: {0}")]
    Malformed(String),
}

/// Fatal extraction failure; carries the raw input for diagnostics
#[derive(Debug, Error)]
#[error("Findings extraction failed: {cause}")]
pub struct ExtractionError {
    /// Raw findings exactly as supplied
    pub raw_input: String,
    #[source]
    pub cause: ExtractionFailure,
}

impl ExtractionError {
    pub fn new(raw_input: impl Into<String>, cause: ExtractionFailure) -> Self {
        Self {
            raw_input: raw_input.into(),
            cause,
        }
    }

    pub fn empty(raw_input: &str) -> Self {
        Self::new(raw_input, ExtractionFailure::EmptyInput)
    }

    pub fn no_headings(raw_input: &str) -> Self {
        Self::new(raw_input, ExtractionFailure::NoHeadings)
    }

    pub fn completion(raw_input: &str, err: CompletionError) -> Self {
        Self::new(raw_input, ExtractionFailure::Completion(err))
    }

    pub fn malformed(raw_input: &str, message: impl Into<String>) -> Self {
        Self::new(raw_input, ExtractionFailure::Malformed(message.into()))
    }
}

/// Single-organ failure, recovered locally as a placeholder section
#[derive(Debug, Error)]
#[error("{organ} agent failed: {source}")]
pub struct OrganAgentError {
    pub organ: String,
    pub source: CompletionError,
}

/// Impression failure, recovered locally as a placeholder impression
#[derive(Debug, Error)]
#[error("Impression agent failed: {source}")]
pub struct ImpressionError {
    pub source: CompletionError,
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Input error for {path}: {message}")]
    Input { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, ReportError>;

// =============================================================================
// Tests
// =============================================================================
