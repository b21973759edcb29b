//! AI Integration Layer
//!
//! Text-completion clients, call timeouts and per-run usage metrics.

pub mod metrics;
pub mod provider;
pub mod timeout;

pub use metrics::{MetricsCollector, SharedMetrics, UsageSummary, create_shared_metrics};
pub use provider::{
    Completion, CompletionCategory, CompletionClient, CompletionError, CompletionRequest,
    ErrorClassifier, GeminiProvider, OllamaProvider, OpenAiProvider, ProviderConfig,
    ResponseMetadata, ResponseTiming, SharedClient, TokenUsage, create_client,
};
pub use timeout::with_timeout;
