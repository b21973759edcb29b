//! Impression agent: summarises the assembled findings into a short,
//! numbered list of clinically significant items.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Duration;

use super::section::{OrganSection, SectionStatus};
use crate::ai::{CompletionError, CompletionRequest, SharedClient, SharedMetrics, with_timeout};
use crate::constants::report::{IMPRESSION_HEADER, NO_ABNORMALITY, NO_ABNORMALITY_PHRASE};
use crate::types::{ImpressionError, collapse_whitespace};

const IMPRESSION_INSTRUCTION: &str = "\
You are a senior radiologist writing the clinical impression of an abdominal ultrasound report.

Guidelines:
- Summarize only the clinically significant findings, most important first
- Write one finding per line, each a short complete sentence
- Do not repeat normal findings
- If nothing is significant, reply exactly: No significant abnormality detected.
- Do not include the word IMPRESSION or any other header";

// `1.` only counts as a marker when whitespace follows, so `4.2 cm` survives.
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+\.(?:\s+|$)|\d+\)\s*|[-*•]\s*)").expect("valid list marker regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImpressionStatus {
    NoAbnormality,
    Generated { findings: usize },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Impression {
    pub text: String,
    pub status: ImpressionStatus,
}

impl Impression {
    pub fn no_abnormality() -> Self {
        Self {
            text: NO_ABNORMALITY.to_string(),
            status: ImpressionStatus::NoAbnormality,
        }
    }

    /// Placeholder: `Impression unavailable: <reason>`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            text: format!("Impression unavailable: {}", reason),
            status: ImpressionStatus::Unavailable { reason },
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, ImpressionStatus::Unavailable { .. })
    }
}

pub struct ImpressionAgent {
    client: SharedClient,
    timeout: Duration,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
    metrics: Option<SharedMetrics>,
}

impl ImpressionAgent {
    pub fn new(client: SharedClient, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            max_output_tokens: None,
            temperature: None,
            metrics: None,
        }
    }

    pub fn with_generation(mut self, max_output_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn summarize(
        &self,
        findings_text: &str,
        sections: &[OrganSection],
    ) -> Result<Impression, ImpressionError> {
        if sections.iter().all(is_normal_section) {
            tracing::debug!("ImpressionAgent: all sections normal, no call");
            if let Some(m) = &self.metrics {
                m.record_skip();
            }
            return Ok(Impression::no_abnormality());
        }

        let request = CompletionRequest {
            system_instruction: IMPRESSION_INSTRUCTION.to_string(),
            user_content: format!("Findings:\n{}", findings_text.trim()),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        };

        let result = with_timeout(self.timeout, self.client.complete(&request), "impression")
            .await
            .and_then(|completion| {
                if let Some(m) = &self.metrics {
                    m.record_completion(&completion);
                }
                normalize(&completion.text)
                    .ok_or_else(|| CompletionError::malformed("empty impression reply"))
            });

        result.map_err(|source| {
            if let Some(m) = &self.metrics {
                m.record_failure();
            }
            ImpressionError { source }
        })
    }

    /// Never fails; errors become the placeholder impression.
    pub async fn impression(&self, findings_text: &str, sections: &[OrganSection]) -> Impression {
        match self.summarize(findings_text, sections).await {
            Ok(impression) => impression,
            Err(e) => {
                tracing::warn!("{}", e);
                Impression::unavailable(e.source.reason())
            }
        }
    }
}

fn is_normal_section(section: &OrganSection) -> bool {
    match section.status() {
        SectionStatus::Normal => true,
        SectionStatus::Unavailable { .. } => false,
        SectionStatus::Generated => {
            let text = section.text().trim();
            text.is_empty() || is_no_abnormality(text)
        }
    }
}

fn is_no_abnormality(text: &str) -> bool {
    text.trim_end_matches('.')
        .trim()
        .eq_ignore_ascii_case(NO_ABNORMALITY_PHRASE)
}

/// Strip bullets and numbering, then renumber when there is more than one item.
fn normalize(reply: &str) -> Option<Impression> {
    let items: Vec<String> = reply
        .lines()
        .map(|line| LIST_MARKER.replace(line, "").into_owned())
        .map(|line| collapse_whitespace(&line))
        .filter(|line| !line.is_empty())
        .filter(|line| {
            !line
                .trim_end_matches(':')
                .eq_ignore_ascii_case(IMPRESSION_HEADER.trim_end_matches(':'))
        })
        .collect();

    match items.as_slice() {
        [] => None,
        [single] if is_no_abnormality(single) => Some(Impression::no_abnormality()),
        [single] => Some(Impression {
            text: as_sentence(single),
            status: ImpressionStatus::Generated { findings: 1 },
        }),
        many => Some(Impression {
            text: many
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {}", i + 1, as_sentence(item)))
                .collect::<Vec<_>>()
                .join("\n"),
            status: ImpressionStatus::Generated {
                findings: many.len(),
            },
        }),
    }
}

fn as_sentence(text: &str) -> String {
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::CompletionCategory;
    use crate::ai::provider::mock::ScriptedClient;
    use std::sync::Arc;

    fn agent(client: Arc<ScriptedClient>) -> ImpressionAgent {
        ImpressionAgent::new(client, Duration::from_secs(5))
    }

    #[test]
    fn test_normalize_numbers_multiple_items() {
        let imp = normalize("IMPRESSION:\n- Fatty liver\n* Right renal cyst, 2 cm.").unwrap();
        assert_eq!(imp.text, "1. Fatty liver.\n2. Right renal cyst, 2 cm.");
        assert_eq!(imp.status, ImpressionStatus::Generated { findings: 2 });
    }

    #[test]
    fn test_normalize_single_item_unnumbered() {
        let imp = normalize("1. Infrarenal abdominal aortic aneurysm measuring 4.2 cm").unwrap();
        assert_eq!(
            imp.text,
            "Infrarenal abdominal aortic aneurysm measuring 4.2 cm."
        );
    }

    #[test]
    fn test_normalize_keeps_leading_decimal_measurement() {
        let imp = normalize("4.2 cm infrarenal abdominal aortic aneurysm").unwrap();
        assert_eq!(imp.text, "4.2 cm infrarenal abdominal aortic aneurysm.");

        let imp = normalize("1. 4.2 cm infrarenal abdominal aortic aneurysm").unwrap();
        assert_eq!(imp.text, "4.2 cm infrarenal abdominal aortic aneurysm.");
    }

    #[test]
    fn test_normalize_numbers_items_starting_with_measurements() {
        let imp = normalize("2.5 mm gallbladder polyp\n2) 2 cm simple cyst in the left kidney").unwrap();
        assert_eq!(
            imp.text,
            "1. 2.5 mm gallbladder polyp.\n2. 2 cm simple cyst in the left kidney."
        );
    }

    #[test]
    fn test_normalize_no_abnormality_and_empty() {
        assert_eq!(
            normalize("No significant abnormality detected").unwrap(),
            Impression::no_abnormality()
        );
        assert!(normalize(" \n- \n").is_none());
    }

    #[tokio::test]
    async fn test_all_normal_skips_call() {
        let client = Arc::new(ScriptedClient::new().default_reply("unused"));
        let sections = vec![
            OrganSection::normal("Liver", "The liver is normal."),
            OrganSection::generated("Spleen", "No significant abnormality detected."),
        ];

        let imp = agent(client.clone()).summarize("...", &sections).await.unwrap();
        assert_eq!(imp.text, NO_ABNORMALITY);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_section_is_not_normal() {
        let client = Arc::new(
            ScriptedClient::new().reply_when("clinical impression", "Kidney findings could not be reported"),
        );
        let sections = vec![OrganSection::unavailable("Kidney", "request timed out")];

        let imp = agent(client.clone()).summarize("Kidney: ...", &sections).await.unwrap();
        assert_eq!(client.call_count(), 1);
        assert_eq!(imp.status, ImpressionStatus::Generated { findings: 1 });
    }

    #[tokio::test]
    async fn test_failure_becomes_placeholder() {
        let client = Arc::new(
            ScriptedClient::new().fail_when("clinical impression", CompletionCategory::Unavailable),
        );
        let sections = vec![OrganSection::generated("Liver", "Fatty infiltration.")];

        let imp = agent(client).impression("Liver: Fatty infiltration.", &sections).await;
        assert_eq!(imp.text, "Impression unavailable: service unavailable");
        assert!(imp.is_unavailable());
    }
}
