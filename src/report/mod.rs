//! Report pipeline: extraction, per-organ agents, impression, batch output.

pub mod agent;
pub mod batch;
pub mod extractor;
pub mod findings;
pub mod impression;
pub mod orchestrator;
pub mod organ;
pub mod section;
pub mod specialization;

pub use agent::{AgentSettings, OrganReportAgent};
pub use batch::{BatchRunner, BatchSummary, PatientInput, PatientOutcome};
pub use extractor::{FieldExtractor, HeadingExtractor, LlmExtractor};
pub use findings::{ExtraOrgan, OrganFindings, StructuredFindings, is_no_pathology};
pub use impression::{Impression, ImpressionAgent, ImpressionStatus};
pub use orchestrator::{FinalReport, PipelineOptions, ReportOrchestrator};
pub use organ::Organ;
pub use section::{FindingsReport, OrganSection, SectionStatus};
pub use specialization::Specialization;
