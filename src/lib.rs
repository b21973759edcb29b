//! radreport - multi-agent radiology report generation
//!
//! Turns terse abdominal ultrasound findings into a structured report: one
//! prose section per organ, then a clinical impression.
//!
//! ## Pipeline
//!
//! 1. A `FieldExtractor` splits the raw text into organ fields
//! 2. Six fixed organ agents run concurrently; results keep canonical order
//! 3. Organs outside the fixed set run through a generic agent
//! 4. The `ImpressionAgent` summarises the assembled findings
//!
//! Empty or `NP` findings resolve to fixed normal sentences without any
//! model call. A failed organ becomes a placeholder section; only extraction
//! failure aborts a run.
//!
//! ## Quick Start
//!
//! ```ignore
//! use radreport::{ConfigLoader, ReportOrchestrator, create_client};
//!
//! let config = ConfigLoader::load()?;
//! let client = create_client(&config.llm.to_provider_config())?;
//! let orchestrator = ReportOrchestrator::from_config(&config, client);
//! let report = orchestrator.build_report("Liver - NP\nGB - stones 12mm").await?;
//! println!("{}", report.render());
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: completion client abstraction, providers, timeouts, metrics
//! - [`report`]: extraction, organ agents, impression, orchestration, batch
//! - [`config`]: layered configuration
//! - [`cli`]: command handlers for the `radreport` binary

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod report;
pub mod types;

// Configuration
pub use config::{Config, ConfigLoader, ExtractorKind};

// Error Types
pub use types::error::{
    CompletionCategory, CompletionError, ExtractionError, ExtractionFailure, ImpressionError,
    OrganAgentError, ReportError, Result,
};
pub use types::{PatientId, RunId};

// AI
pub use ai::{
    CompletionClient, CompletionRequest, MetricsCollector, SharedClient, UsageSummary,
    create_client, with_timeout,
};

// Pipeline
pub use report::{
    BatchRunner, FinalReport, FindingsReport, Impression, ImpressionStatus, Organ, OrganSection,
    PipelineOptions, ReportOrchestrator, SectionStatus, StructuredFindings,
};
