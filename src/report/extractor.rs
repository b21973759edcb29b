//! Field extraction: raw findings text → `StructuredFindings`.
//!
//! Two implementations:
//! - `HeadingExtractor`: local, heading-delimited parsing (default)
//! - `LlmExtractor`: asks the model for a JSON object keyed by organ
//!
//! Extraction failure is fatal for a run; the raw input travels with the error.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::findings::{StructuredFindings, is_no_pathology};
use super::organ::Organ;
use crate::ai::{CompletionRequest, SharedClient, SharedMetrics, with_timeout};
use crate::types::{ExtractionError, collapse_whitespace, extract_json_object};

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extractor name for logging
    fn name(&self) -> &str;

    async fn extract(&self, raw: &str) -> Result<StructuredFindings, ExtractionError>;
}

// =============================================================================
// Heading Extractor
// =============================================================================

/// `(alias, organ, sub_heading)`; sub-headings keep their line as findings text.
const FIXED_ALIASES: &[(&str, Organ, bool)] = &[
    ("liver", Organ::Liver, false),
    ("gb", Organ::Gallbladder, false),
    ("gallbladder", Organ::Gallbladder, false),
    ("gall bladder", Organ::Gallbladder, false),
    ("cbd", Organ::Gallbladder, true),
    ("common bile duct", Organ::Gallbladder, true),
    ("pancreas", Organ::Pancreas, false),
    ("mpd", Organ::Pancreas, true),
    ("spleen", Organ::Spleen, false),
    ("kidney", Organ::Kidney, false),
    ("kidneys", Organ::Kidney, false),
    ("renal", Organ::Kidney, false),
    ("aorta", Organ::Aorta, false),
    ("abdominal aorta", Organ::Aorta, false),
];

const COMMENT_ALIASES: &[&str] = &["comment", "comments"];

/// Headings recognised as extra organs out of the box
const EXTRA_VOCABULARY: &[&str] = &[
    "adrenal",
    "adrenals",
    "adrenal glands",
    "bladder",
    "urinary bladder",
    "prostate",
    "thyroid",
    "uterus",
    "ovary",
    "ovaries",
    "adnexa",
    "scrotum",
    "testis",
    "testes",
    "appendix",
    "bowel",
    "lymph nodes",
    "ascites",
    "pleura",
    "abdominal wall",
    "peritoneum",
    "retroperitoneum",
];

#[derive(Debug, PartialEq)]
enum Heading<'a> {
    Fixed { organ: Organ, sub: bool },
    Extra(&'a str),
    Comment,
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    Preamble,
    Fixed(Organ),
    Extra(usize),
    Comment,
}

/// Deterministic heading-delimited parser.
///
/// A line is a heading when the text before its first `-` or `:` (or the whole
/// line) is a known alias. Text after the separator is inline findings for that
/// heading (`GB - NP`).
#[derive(Debug, Clone, Default)]
pub struct HeadingExtractor {
    extra_headings: Vec<String>,
}

impl HeadingExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognise additional extra-organ headings
    pub fn with_extra_headings(mut self, headings: &[String]) -> Self {
        self.extra_headings = headings
            .iter()
            .map(|h| normalize_head(h))
            .filter(|h| !h.is_empty())
            .collect();
        self
    }

    fn classify<'a>(&self, line: &'a str) -> Option<(Heading<'a>, &'a str)> {
        let trimmed = line.trim();
        let (head, rest) = match trimmed.find(['-', ':']) {
            Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
            None => (trimmed, ""),
        };
        let head = head.trim();
        let key = normalize_head(head);
        if key.is_empty() {
            return None;
        }
        let inline = rest.trim_start_matches(|c: char| c == '-' || c == ':' || c.is_whitespace());

        if let Some((_, organ, sub)) = FIXED_ALIASES.iter().find(|(alias, _, _)| *alias == key) {
            return Some((
                Heading::Fixed {
                    organ: *organ,
                    sub: *sub,
                },
                inline,
            ));
        }
        if COMMENT_ALIASES.contains(&key.as_str()) {
            return Some((Heading::Comment, inline));
        }
        if EXTRA_VOCABULARY.contains(&key.as_str()) || self.extra_headings.contains(&key) {
            return Some((Heading::Extra(head), inline));
        }
        None
    }

    /// Parse synchronously; the async trait method delegates here.
    ///
    /// A short bare line (no separator, no digits) that follows a findings
    /// line and is itself followed by findings is read as an unlisted organ
    /// heading. It becomes an extra organ and an anomaly is recorded.
    pub fn parse(&self, raw: &str) -> Result<StructuredFindings, ExtractionError> {
        if raw.trim().is_empty() {
            return Err(ExtractionError::empty(raw));
        }

        let lines: Vec<&str> = raw.lines().collect();
        let mut findings = StructuredFindings::new();
        let mut cursor = Cursor::Preamble;
        let mut preamble = 0usize;
        // last non-empty line was findings text rather than a heading or label
        let mut after_findings = false;

        for (i, &line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match self.classify(line) {
                Some((Heading::Fixed { organ, sub: false }, inline)) => {
                    findings.add_fixed(organ, inline);
                    cursor = Cursor::Fixed(organ);
                    after_findings = !inline.is_empty();
                }
                Some((Heading::Fixed { organ, sub: true }, _)) => {
                    findings.append_fixed(organ, line);
                    cursor = Cursor::Fixed(organ);
                    after_findings = false;
                }
                Some((Heading::Extra(name), inline)) => {
                    cursor = Cursor::Extra(findings.add_extra(name, inline));
                    after_findings = !inline.is_empty();
                }
                Some((Heading::Comment, inline)) => {
                    findings.append_comment(inline);
                    cursor = Cursor::Comment;
                    after_findings = false;
                }
                None if after_findings
                    && matches!(cursor, Cursor::Fixed(_) | Cursor::Extra(_))
                    && is_bare_heading(line)
                    && self.findings_follow(&lines[i + 1..]) =>
                {
                    let name = collapse_whitespace(line);
                    tracing::debug!("Extract: unlisted heading '{}' read as extra organ", name);
                    findings.record_anomaly(format!(
                        "Unlisted heading '{}' captured as extra organ",
                        name
                    ));
                    cursor = Cursor::Extra(findings.add_extra(&name, ""));
                    after_findings = false;
                }
                None => {
                    match cursor {
                        Cursor::Preamble => preamble += 1,
                        Cursor::Fixed(organ) => findings.append_fixed(organ, line),
                        Cursor::Extra(idx) => findings.append_extra(idx, line),
                        Cursor::Comment => findings.append_comment(line),
                    }
                    after_findings = !line.trim_end().ends_with(':');
                }
            }
        }

        if !findings.has_content() {
            return Err(ExtractionError::no_headings(raw));
        }

        if preamble > 0 {
            tracing::debug!("Extract: dropped {} line(s) before first heading", preamble);
        }

        Ok(findings)
    }

    /// Whether the next non-empty line is plain findings text
    fn findings_follow(&self, rest: &[&str]) -> bool {
        rest.iter()
            .find(|l| !l.trim().is_empty())
            .is_some_and(|next| self.classify(next).is_none() && !is_bare_heading(next))
    }
}

#[async_trait]
impl FieldExtractor for HeadingExtractor {
    fn name(&self) -> &str {
        "heading"
    }

    async fn extract(&self, raw: &str) -> Result<StructuredFindings, ExtractionError> {
        self.parse(raw)
    }
}

/// Up to three capitalised words of letters only, not a no-pathology marker
fn is_bare_heading(line: &str) -> bool {
    let trimmed = line.trim();
    let words = trimmed.split_whitespace().count();
    (1..=3).contains(&words)
        && trimmed.starts_with(|c: char| c.is_uppercase())
        && trimmed.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
        && !is_no_pathology(trimmed)
}

fn normalize_head(head: &str) -> String {
    collapse_whitespace(head)
        .trim_end_matches('.')
        .trim()
        .to_lowercase()
}

// =============================================================================
// LLM Extractor
// =============================================================================

const SPLITTER_INSTRUCTION: &str = "\
You are a medical data extraction specialist. Parse the radiology findings below \
and sort them by body part.

Categories, in this order:
1. liver
2. gb (gallbladder, including the CBD)
3. pancreas (including the MPD)
4. spleen
5. kidney
6. aorta
7. others: any organ not listed above
8. comment: free-text comments or conclusions

Return ONLY a JSON object with the keys liver, gb, pancreas, spleen, kidney, aorta, \
others and comment. Each organ key maps to the findings text for that organ, or an \
empty string when the organ is not mentioned. \"others\" is a list of objects with \
\"organ\" and \"findings\" keys. If a section reads \"NP\", keep it as \"NP\". \
Preserve all measurements and details exactly as written.";

const SPLITTER_KEYS: &[&str] = &["liver", "gb", "gallbladder", "pancreas", "spleen", "kidney", "aorta"];

/// Model-backed splitter
pub struct LlmExtractor {
    client: SharedClient,
    timeout: Duration,
    metrics: Option<SharedMetrics>,
}

impl LlmExtractor {
    pub fn new(client: SharedClient, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Normalise a splitter reply into `StructuredFindings`
    pub fn parse_reply(raw: &str, reply: &str) -> Result<StructuredFindings, ExtractionError> {
        let json = extract_json_object(reply)
            .ok_or_else(|| ExtractionError::malformed(raw, "no JSON object in reply"))?;
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ExtractionError::malformed(raw, e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| ExtractionError::malformed(raw, "reply is not a JSON object"))?;

        let mut findings = StructuredFindings::new();

        for (key, value) in object {
            match key.as_str() {
                k if SPLITTER_KEYS.contains(&k) => {
                    if let (Some(organ), Some(text)) = (Organ::from_key(k), value_text(value)) {
                        findings.add_fixed(organ, &text);
                    }
                }
                "others" => {
                    for item in value.as_array().into_iter().flatten() {
                        let name = item.get("organ").and_then(value_text);
                        let text = item
                            .get("findings")
                            .and_then(value_text)
                            .unwrap_or_default();
                        match name {
                            Some(name) => match Organ::from_key(&name) {
                                Some(organ) => {
                                    findings.add_fixed(organ, &text);
                                }
                                None => {
                                    findings.add_extra(&name, &text);
                                }
                            },
                            None => findings.record_anomaly("Extra organ entry without a name"),
                        }
                    }
                }
                "comment" => {
                    if let Some(text) = value_text(value) {
                        findings.append_comment(&text);
                    }
                }
                other => findings.record_anomaly(format!("Ignored unexpected key '{}'", other)),
            }
        }

        if !findings.has_content() {
            return Err(ExtractionError::no_headings(raw));
        }

        Ok(findings)
    }
}

#[async_trait]
impl FieldExtractor for LlmExtractor {
    fn name(&self) -> &str {
        "llm"
    }

    async fn extract(&self, raw: &str) -> Result<StructuredFindings, ExtractionError> {
        if raw.trim().is_empty() {
            return Err(ExtractionError::empty(raw));
        }

        let request = CompletionRequest::new(SPLITTER_INSTRUCTION, raw);
        let completion = match with_timeout(
            self.timeout,
            self.client.complete(&request),
            "findings extraction",
        )
        .await
        {
            Ok(c) => c,
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.record_failure();
                }
                return Err(ExtractionError::completion(raw, e));
            }
        };

        if let Some(m) = &self.metrics {
            m.record_completion(&completion);
        }

        Self::parse_reply(raw, &completion.text)
    }
}

/// Non-empty text for a JSON value; string arrays are joined by newlines.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::ScriptedClient;
    use crate::ai::{CompletionCategory, MetricsCollector};
    use crate::types::ExtractionFailure;
    use std::sync::Arc;

    const SAMPLE: &str = "Liver\n- NP\nGB\nPolyp:\n- (2.5mm, 2.1mm, 1.6mm)\nCBD\nDiameter\n- (1.6 mm)\n\
Pancreas\n- NP\nMPD:\n- (0.5 mm)\nSpleen\n- NP\nKidney\n- NP\nAorta\n- NP\nComment\n- Gallbladder polyps";

    #[test]
    fn test_sample_layout() {
        let findings = HeadingExtractor::new().parse(SAMPLE).unwrap();

        assert!(findings.get(Organ::Liver).is_normal());
        let gb = &findings.get(Organ::Gallbladder).text;
        assert!(gb.contains("Polyp"));
        assert!(gb.contains("CBD"));
        assert!(gb.contains("1.6 mm"));
        let pancreas = findings.get(Organ::Pancreas);
        assert!(pancreas.text.contains("MPD"));
        assert!(!pancreas.is_normal());
        assert!(findings.get(Organ::Aorta).is_normal());
        assert_eq!(findings.comment(), Some("- Gallbladder polyps"));
        assert!(findings.anomalies().is_empty());
    }

    #[test]
    fn test_inline_headings_and_extras() {
        let raw = "GB - NP\nSpleen - Accessory Spleen ( 8.6 x 5.8 mm )\nBladder - Not well distended\n\
Prostate\n- V= 39.9 cm3\n- Calc+\nAorta - Plaques: ( 15.8 x 2.4 mm) - Largest";
        let findings = HeadingExtractor::new().parse(raw).unwrap();

        assert_eq!(findings.get(Organ::Gallbladder).text, "NP");
        assert_eq!(
            findings.get(Organ::Spleen).text,
            "Accessory Spleen ( 8.6 x 5.8 mm )"
        );
        assert_eq!(
            findings.get(Organ::Aorta).text,
            "Plaques: ( 15.8 x 2.4 mm) - Largest"
        );
        let names: Vec<_> = findings.extras().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Bladder", "Prostate"]);
        assert_eq!(findings.extras()[1].findings, "- V= 39.9 cm3\n- Calc+");
        assert!(!findings.get(Organ::Liver).reported);
    }

    #[test]
    fn test_unknown_heading_like_lines_stay_with_organ() {
        let raw = "Kidney\nRight: 11cm normal. Left: 12cm, simple cyst 2cm\nUreter Dilatation - Right";
        let findings = HeadingExtractor::new().parse(raw).unwrap();
        let kidney = &findings.get(Organ::Kidney).text;
        assert!(kidney.contains("simple cyst"));
        assert!(kidney.contains("Ureter Dilatation"));
    }

    #[test]
    fn test_preamble_dropped() {
        let raw = "Patient: 12345\nUS abdomen\nLiver\nNP";
        let findings = HeadingExtractor::new().parse(raw).unwrap();
        assert_eq!(findings.get(Organ::Liver).text, "NP");
    }

    #[test]
    fn test_configured_extra_heading() {
        let raw = "Liver\nNP\nGastric antrum\nWall thickening 8mm";
        let plain = HeadingExtractor::new().parse(raw).unwrap();
        assert_eq!(plain.extras()[0].name, "Gastric antrum");
        assert_eq!(plain.anomalies().len(), 1);

        let configured = HeadingExtractor::new()
            .with_extra_headings(&["Gastric Antrum".to_string()])
            .parse(raw)
            .unwrap();
        assert_eq!(configured.extras()[0].name, "Gastric antrum");
        assert_eq!(configured.extras()[0].findings, "Wall thickening 8mm");
        assert!(configured.anomalies().is_empty());
    }

    #[test]
    fn test_unlisted_heading_after_block_becomes_extra() {
        let raw = "Kidney\nRight: 11cm normal. Left: 12cm, simple cyst 2cm\nUreter\nRight distal ureter dilated 9mm";
        let findings = HeadingExtractor::new().parse(raw).unwrap();

        let kidney = &findings.get(Organ::Kidney).text;
        assert!(kidney.contains("simple cyst"));
        assert!(!kidney.contains("Ureter"));
        assert!(!kidney.contains("9mm"));
        assert_eq!(findings.extras()[0].name, "Ureter");
        assert_eq!(findings.extras()[0].findings, "Right distal ureter dilated 9mm");
        assert_eq!(
            findings.anomalies(),
            ["Unlisted heading 'Ureter' captured as extra organ".to_string()]
        );
    }

    #[test]
    fn test_bare_lines_that_stay_with_organ() {
        let raw = "GB - NP\nCBD\nDiameter\n- (1.6 mm)\nLiver\nNormal\nSpan 15cm\nFatty change";
        let findings = HeadingExtractor::new().parse(raw).unwrap();

        assert!(findings.get(Organ::Gallbladder).text.contains("Diameter"));
        let liver = &findings.get(Organ::Liver).text;
        assert!(liver.contains("Normal"));
        assert!(liver.ends_with("Fatty change"));
        assert!(findings.extras().is_empty());
        assert!(findings.anomalies().is_empty());
    }

    #[test]
    fn test_sub_heading_before_primary_heading() {
        let raw = "CBD - 6mm\nGB - NP\nLiver - NP";
        let findings = HeadingExtractor::new().parse(raw).unwrap();

        assert_eq!(findings.get(Organ::Gallbladder).text, "CBD - 6mm\nNP");
        assert!(findings.anomalies().is_empty());
    }

    #[test]
    fn test_empty_input() {
        let err = HeadingExtractor::new().parse("  \n\t ").unwrap_err();
        assert!(matches!(err.cause, ExtractionFailure::EmptyInput));
    }

    #[test]
    fn test_no_headings() {
        let raw = "the quick brown fox\njumps over";
        let err = HeadingExtractor::new().parse(raw).unwrap_err();
        assert!(matches!(err.cause, ExtractionFailure::NoHeadings));
        assert_eq!(err.raw_input, raw);
    }

    #[test]
    fn test_parse_reply() {
        let reply = r#"```json
{"liver": "NP", "gb": "Polyp 2.5mm", "pancreas": "", "spleen": null,
 "kidney": "Right 11cm", "aorta": "NP",
 "others": [{"organ": "Adrenal", "findings": "1.5cm nodule, right"}],
 "comment": "Follow up"}
```"#;
        let findings = LlmExtractor::parse_reply("raw", reply).unwrap();
        assert_eq!(findings.get(Organ::Gallbladder).text, "Polyp 2.5mm");
        assert!(!findings.get(Organ::Pancreas).reported);
        assert!(!findings.get(Organ::Spleen).reported);
        assert_eq!(findings.extras()[0].name, "Adrenal");
        assert_eq!(findings.comment(), Some("Follow up"));
    }

    #[test]
    fn test_parse_reply_malformed() {
        let err = LlmExtractor::parse_reply("raw input", "I cannot help").unwrap_err();
        assert!(matches!(err.cause, ExtractionFailure::Malformed(_)));
        assert_eq!(err.raw_input, "raw input");
    }

    #[tokio::test]
    async fn test_llm_extractor_completion_failure() {
        let client = Arc::new(
            ScriptedClient::new().fail_when("extraction specialist", CompletionCategory::Auth),
        );
        let metrics = Arc::new(MetricsCollector::new("t"));
        let extractor = LlmExtractor::new(client, Duration::from_secs(1))
            .with_metrics(metrics.clone());

        let err = extractor.extract("Liver\nNP").await.unwrap_err();
        assert!(matches!(err.cause, ExtractionFailure::Completion(_)));
        assert_eq!(metrics.summary().failed_calls, 1);
    }

    #[tokio::test]
    async fn test_llm_extractor_skips_call_on_empty_input() {
        let client = Arc::new(ScriptedClient::new().default_reply("{}"));
        let extractor = LlmExtractor::new(client.clone(), Duration::from_secs(1));

        assert!(extractor.extract("   ").await.is_err());
        assert_eq!(client.call_count(), 0);
    }
}
