//! Organ report agent.
//!
//! A single behaviour driven by a `Specialization` record: format a request,
//! call the completion client, return trimmed single-line prose. Empty or
//! no-pathology findings short-circuit to the record's normal sentence.

use std::time::Duration;

use super::findings::is_no_pathology;
use super::section::OrganSection;
use super::specialization::Specialization;
use crate::ai::{CompletionError, CompletionRequest, SharedClient, SharedMetrics, with_timeout};
use crate::constants::llm::DEFAULT_TIMEOUT_SECS;
use crate::types::{OrganAgentError, collapse_whitespace};

/// Call settings shared by every agent in a run
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Bound on each completion call
    pub timeout: Duration,
    /// Answer empty/NP findings without a call
    pub short_circuit_normal: bool,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            short_circuit_normal: true,
            max_output_tokens: None,
            temperature: None,
        }
    }
}

pub struct OrganReportAgent {
    specialization: Specialization,
    client: SharedClient,
    settings: AgentSettings,
    context: Option<String>,
    metrics: Option<SharedMetrics>,
}

impl OrganReportAgent {
    pub fn new(specialization: Specialization, client: SharedClient, settings: AgentSettings) -> Self {
        Self {
            specialization,
            client,
            settings,
            context: None,
            metrics: None,
        }
    }

    /// Supporting free text sent alongside the findings (the report comment)
    pub fn with_context(mut self, context: Option<&str>) -> Self {
        self.context = context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn label(&self) -> &str {
        &self.specialization.label
    }

    /// Prose for one organ's findings
    pub async fn generate(&self, findings: &str) -> Result<String, OrganAgentError> {
        if self.short_circuits(findings) {
            self.record_skip();
            return Ok(self.specialization.normal_sentence.to_string());
        }
        self.call(findings).await
    }

    /// Like `generate`, but failures become a placeholder section
    pub async fn section(&self, findings: &str) -> OrganSection {
        let label = self.label().to_string();

        if self.short_circuits(findings) {
            self.record_skip();
            tracing::debug!("{}Agent: normal findings, no call", label);
            return OrganSection::normal(label, self.specialization.normal_sentence.clone());
        }

        match self.call(findings).await {
            Ok(text) => OrganSection::generated(label, text),
            Err(e) => {
                tracing::warn!("{}", e);
                OrganSection::unavailable(label, e.source.reason())
            }
        }
    }

    fn short_circuits(&self, findings: &str) -> bool {
        self.settings.short_circuit_normal
            && (findings.trim().is_empty() || is_no_pathology(findings))
    }

    fn record_skip(&self) {
        if let Some(m) = &self.metrics {
            m.record_skip();
        }
    }

    fn build_request(&self, findings: &str) -> CompletionRequest {
        let findings = findings.trim();
        let mut content = format!(
            "Findings for the {}:\n{}",
            self.specialization.label.to_lowercase(),
            if findings.is_empty() {
                "(no findings reported)"
            } else {
                findings
            }
        );
        if let Some(context) = &self.context {
            content.push_str("\n\nSupporting comment:\n");
            content.push_str(context);
        }

        CompletionRequest {
            system_instruction: self.specialization.instruction.to_string(),
            user_content: content,
            max_output_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        }
    }

    async fn call(&self, findings: &str) -> Result<String, OrganAgentError> {
        let label = self.label();
        tracing::debug!("{}Agent: generating section", label);

        let request = self.build_request(findings);
        let op = format!("{} section", label);
        let result = with_timeout(self.settings.timeout, self.client.complete(&request), &op)
            .await
            .and_then(|completion| {
                if let Some(m) = &self.metrics {
                    m.record_completion(&completion);
                }
                self.clean_reply(&completion.text)
                    .ok_or_else(|| CompletionError::malformed("empty reply"))
            });

        result.map_err(|source| {
            if let Some(m) = &self.metrics {
                m.record_failure();
            }
            OrganAgentError {
                organ: label.to_string(),
                source,
            }
        })
    }

    /// Trim, drop an echoed `<Label>:` prefix, and collapse to one line.
    fn clean_reply(&self, text: &str) -> Option<String> {
        let mut text = text.trim();
        let label = self.label();
        if text.len() > label.len()
            && text.is_char_boundary(label.len())
            && text[..label.len()].eq_ignore_ascii_case(label)
            && text[label.len()..].starts_with(':')
        {
            text = text[label.len() + 1..].trim_start();
        }
        let text = collapse_whitespace(text);
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::ScriptedClient;
    use crate::ai::{CompletionCategory, MetricsCollector};
    use crate::report::organ::Organ;
    use crate::report::section::SectionStatus;
    use std::sync::Arc;

    fn agent(client: Arc<ScriptedClient>, organ: Organ) -> OrganReportAgent {
        OrganReportAgent::new(
            Specialization::for_organ(organ),
            client,
            AgentSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_np_short_circuits_without_call() {
        let client = Arc::new(ScriptedClient::new().default_reply("should not be used"));
        let liver = agent(client.clone(), Organ::Liver);

        let first = liver.generate("NP").await.unwrap();
        let second = liver.generate("- NP").await.unwrap();
        let empty = liver.section("").await;

        assert_eq!(first, second);
        assert_eq!(first, Specialization::for_organ(Organ::Liver).normal_sentence);
        assert_eq!(*empty.status(), SectionStatus::Normal);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_short_circuit_can_be_disabled() {
        let client = Arc::new(ScriptedClient::new().default_reply("The spleen is unremarkable."));
        let spleen = OrganReportAgent::new(
            Specialization::for_organ(Organ::Spleen),
            client.clone(),
            AgentSettings {
                short_circuit_normal: false,
                ..Default::default()
            },
        );

        let section = spleen.section("NP").await;
        assert_eq!(*section.status(), SectionStatus::Generated);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reply_trimmed_and_single_line() {
        let client = Arc::new(ScriptedClient::new().reply_when(
            "renal imaging",
            "  Kidney: Right kidney 11 cm.\n\nLeft kidney 12 cm with a 2 cm simple cyst.  ",
        ));
        let text = agent(client, Organ::Kidney)
            .generate("Right: 11cm. Left: 12cm, simple cyst 2cm")
            .await
            .unwrap();
        assert_eq!(
            text,
            "Right kidney 11 cm. Left kidney 12 cm with a 2 cm simple cyst."
        );
    }

    #[tokio::test]
    async fn test_failure_becomes_placeholder() {
        let client = Arc::new(
            ScriptedClient::new().fail_when("splenic imaging", CompletionCategory::RateLimit),
        );
        let metrics = Arc::new(MetricsCollector::new("t"));
        let spleen = agent(client, Organ::Spleen).with_metrics(metrics.clone());

        let err = spleen.generate("14cm").await.unwrap_err();
        assert_eq!(err.organ, "Spleen");

        let section = spleen.section("14cm").await;
        assert_eq!(
            section.text(),
            "Report unavailable for Spleen: rate limit or quota exceeded"
        );
        assert_eq!(metrics.summary().failed_calls, 2);
    }

    #[tokio::test]
    async fn test_empty_reply_is_malformed() {
        let client = Arc::new(ScriptedClient::new().default_reply("   \n "));
        let err = agent(client, Organ::Aorta)
            .generate("4.2cm infrarenal aneurysm")
            .await
            .unwrap_err();
        assert_eq!(err.source.category, CompletionCategory::MalformedResponse);
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let client = Arc::new(
            ScriptedClient::new()
                .reply_when("hepatic imaging", "late")
                .delayed(Duration::from_millis(200)),
        );
        let liver = OrganReportAgent::new(
            Specialization::for_organ(Organ::Liver),
            client,
            AgentSettings {
                timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let section = liver.section("Fatty change").await;
        assert_eq!(
            section.text(),
            "Report unavailable for Liver: request timed out"
        );
    }

    #[tokio::test]
    async fn test_extra_carries_comment_context() {
        let client = Arc::new(ScriptedClient::new().default_reply("A right adrenal nodule."));
        let adrenal = OrganReportAgent::new(
            Specialization::other("Adrenal"),
            client.clone(),
            AgentSettings::default(),
        )
        .with_context(Some("Incidental finding"));

        adrenal.generate("1.5cm nodule, right").await.unwrap();

        let request = &client.requests()[0];
        assert!(request.user_content.contains("Findings for the adrenal"));
        assert!(request.user_content.contains("Incidental finding"));
    }
}
