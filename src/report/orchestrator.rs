//! End-to-end report pipeline for one patient.
//!
//! ```text
//! raw text ─▶ FieldExtractor ─▶ 6 fixed agents (fan-out, canonical order)
//!                             ─▶ extra agents (sequential, source order)
//!                             ─▶ findings text ─▶ ImpressionAgent ─▶ FinalReport
//! ```
//!
//! Only extraction failure aborts a run; agent failures become placeholders.

use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

use super::agent::{AgentSettings, OrganReportAgent};
use super::extractor::{FieldExtractor, HeadingExtractor, LlmExtractor};
use super::findings::StructuredFindings;
use super::impression::{Impression, ImpressionAgent};
use super::section::{FindingsReport, OrganSection};
use super::specialization::Specialization;
use crate::ai::{SharedClient, SharedMetrics, UsageSummary, create_shared_metrics};
use crate::config::{Config, ExtractorKind};
use crate::constants::report::{FINDINGS_HEADER, IMPRESSION_HEADER};
use crate::types::{ExtractionError, RunId};

/// Pipeline switches resolved from configuration
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub extractor: ExtractorKind,
    /// Run the six fixed agents concurrently
    pub parallel_organs: bool,
    /// Leave out fixed organs with no heading in the input
    pub omit_unreported_organs: bool,
    pub extra_headings: Vec<String>,
    pub agent: AgentSettings,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::Heading,
            parallel_organs: true,
            omit_unreported_organs: false,
            extra_headings: Vec::new(),
            agent: AgentSettings::default(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extractor: config.pipeline.extractor,
            parallel_organs: config.pipeline.parallel_organs,
            omit_unreported_organs: config.pipeline.omit_unreported_organs,
            extra_headings: config.pipeline.extra_headings.clone(),
            agent: AgentSettings {
                timeout: config.llm.timeout(),
                short_circuit_normal: config.pipeline.short_circuit_normal,
                max_output_tokens: Some(config.llm.max_tokens),
                temperature: Some(config.llm.temperature),
            },
        }
    }
}

/// Output of one run
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub run_id: RunId,
    pub findings: FindingsReport,
    pub impression: Impression,
    pub usage: UsageSummary,
}

impl FinalReport {
    /// `FINDINGS:\n<findings>\n\nIMPRESSION:\n<impression>`
    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n\n{}\n{}",
            FINDINGS_HEADER,
            self.findings.render(),
            IMPRESSION_HEADER,
            self.impression.text
        )
    }

    /// Labels of every part that fell back to a placeholder
    pub fn failures(&self) -> Vec<String> {
        let mut failed: Vec<String> = self
            .findings
            .unavailable()
            .map(|s| s.label().to_string())
            .collect();
        if self.impression.is_unavailable() {
            failed.push("Impression".to_string());
        }
        failed
    }

    pub fn is_complete(&self) -> bool {
        self.failures().is_empty()
    }
}

pub struct ReportOrchestrator {
    client: SharedClient,
    options: PipelineOptions,
    heading: HeadingExtractor,
}

impl ReportOrchestrator {
    pub fn new(client: SharedClient, options: PipelineOptions) -> Self {
        let heading = HeadingExtractor::new().with_extra_headings(&options.extra_headings);
        Self {
            client,
            options,
            heading,
        }
    }

    pub fn from_config(config: &Config, client: SharedClient) -> Self {
        Self::new(client, PipelineOptions::from_config(config))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Split raw findings into organ fields without generating prose
    pub async fn extract(&self, raw: &str) -> Result<StructuredFindings, ExtractionError> {
        let metrics = create_shared_metrics(RunId::generate().as_str());
        self.extract_with(raw, &metrics).await
    }

    /// Full pipeline for one patient
    pub async fn build_report(&self, raw: &str) -> Result<FinalReport, ExtractionError> {
        self.run(raw, RunId::generate()).await
    }

    #[instrument(name = "report", skip_all, fields(run_id = %run_id))]
    async fn run(&self, raw: &str, run_id: RunId) -> Result<FinalReport, ExtractionError> {
        let metrics = create_shared_metrics(run_id.as_str());

        tracing::info!(
            "Extraction: {} extractor, {} chars",
            self.options.extractor,
            raw.len()
        );
        let findings = self.extract_with(raw, &metrics).await?;
        for anomaly in findings.anomalies() {
            tracing::warn!("Extraction: {}", anomaly);
        }

        let mut sections = self.fixed_sections(&findings, &metrics).await;
        tracing::info!("Organs: {} fixed sections ready", sections.len());

        sections.extend(self.extra_sections(&findings, &metrics).await);
        let report = FindingsReport::new(sections);
        let findings_text = report.render();

        tracing::info!("Impression: summarizing {} sections", report.sections().len());
        let impression = ImpressionAgent::new(self.client.clone(), self.options.agent.timeout)
            .with_generation(
                self.options.agent.max_output_tokens,
                self.options.agent.temperature,
            )
            .with_metrics(metrics.clone())
            .impression(&findings_text, report.sections())
            .await;

        let usage = metrics.summary();
        tracing::info!(
            "Report: complete, {} calls ({} failed, {} skipped), {} tokens",
            usage.api_calls,
            usage.failed_calls,
            usage.skipped_calls,
            usage.total_tokens
        );

        let report = FinalReport {
            run_id,
            findings: report,
            impression,
            usage,
        };
        let failures = report.failures();
        if !failures.is_empty() {
            tracing::warn!("Report: placeholders for {}", failures.join(", "));
        }
        Ok(report)
    }

    async fn extract_with(
        &self,
        raw: &str,
        metrics: &SharedMetrics,
    ) -> Result<StructuredFindings, ExtractionError> {
        match self.options.extractor {
            ExtractorKind::Heading => self.heading.extract(raw).await,
            ExtractorKind::Llm => {
                LlmExtractor::new(self.client.clone(), self.timeout())
                    .with_metrics(metrics.clone())
                    .extract(raw)
                    .await
            }
        }
    }

    async fn fixed_sections(
        &self,
        findings: &StructuredFindings,
        metrics: &SharedMetrics,
    ) -> Vec<OrganSection> {
        let work: Vec<(OrganReportAgent, &str)> = findings
            .fixed()
            .filter(|(_, f)| f.reported || !self.options.omit_unreported_organs)
            .map(|(organ, f)| {
                (
                    self.agent(Specialization::for_organ(organ), metrics),
                    f.text.as_str(),
                )
            })
            .collect();

        if self.options.parallel_organs {
            // join_all yields results in input order regardless of completion order
            join_all(work.iter().map(|(agent, text)| agent.section(text))).await
        } else {
            let mut sections = Vec::with_capacity(work.len());
            for (agent, text) in &work {
                sections.push(agent.section(text).await);
            }
            sections
        }
    }

    async fn extra_sections(
        &self,
        findings: &StructuredFindings,
        metrics: &SharedMetrics,
    ) -> Vec<OrganSection> {
        let mut sections = Vec::with_capacity(findings.extras().len());
        for extra in findings.extras() {
            let agent = self
                .agent(Specialization::other(&extra.name), metrics)
                .with_context(findings.comment());
            sections.push(agent.section(&extra.findings).await);
        }
        sections
    }

    fn agent(&self, specialization: Specialization, metrics: &SharedMetrics) -> OrganReportAgent {
        OrganReportAgent::new(
            specialization,
            self.client.clone(),
            self.options.agent.clone(),
        )
        .with_metrics(metrics.clone())
    }

    fn timeout(&self) -> Duration {
        self.options.agent.timeout
    }
}
