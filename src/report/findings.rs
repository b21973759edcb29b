//! Structured findings produced by a field extractor.
//!
//! Invariants held by construction:
//! - all six fixed organs are present (empty text when not reported)
//! - extras keep source order
//! - no extra name appears twice (case-insensitive)
//!
//! A repeated heading merges into its first occurrence and is recorded in
//! `anomalies`.

use serde::{Serialize, Serializer};

use super::organ::Organ;
use crate::constants::report::NO_PATHOLOGY_MARKERS;

/// Findings for one fixed organ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganFindings {
    /// Findings text as written (may be empty)
    pub text: String,
    /// Whether the organ had a heading in the input
    pub reported: bool,
}

impl OrganFindings {
    /// Empty or no-pathology findings
    pub fn is_normal(&self) -> bool {
        self.text.trim().is_empty() || is_no_pathology(&self.text)
    }
}

/// Findings for an organ outside the fixed set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraOrgan {
    /// Display name as written in the heading
    pub name: String,
    pub findings: String,
}

impl ExtraOrgan {
    pub fn is_normal(&self) -> bool {
        self.findings.trim().is_empty() || is_no_pathology(&self.findings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredFindings {
    #[serde(rename = "organs", serialize_with = "serialize_fixed")]
    fixed: [OrganFindings; 6],
    extras: Vec<ExtraOrgan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    anomalies: Vec<String>,
    /// Fixed organs whose primary heading has been seen; sub-headings don't count
    #[serde(skip)]
    primary: [bool; 6],
}

impl Default for StructuredFindings {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredFindings {
    pub fn new() -> Self {
        Self {
            fixed: Default::default(),
            extras: Vec::new(),
            comment: None,
            anomalies: Vec::new(),
            primary: [false; 6],
        }
    }

    pub fn get(&self, organ: Organ) -> &OrganFindings {
        &self.fixed[organ.index()]
    }

    /// Fixed organs in canonical order
    pub fn fixed(&self) -> impl Iterator<Item = (Organ, &OrganFindings)> {
        Organ::CANONICAL.iter().map(|o| (*o, &self.fixed[o.index()]))
    }

    pub fn extras(&self) -> &[ExtraOrgan] {
        &self.extras
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn anomalies(&self) -> &[String] {
        &self.anomalies
    }

    /// Whether any heading at all was captured
    pub fn has_content(&self) -> bool {
        self.fixed.iter().any(|f| f.reported) || !self.extras.is_empty() || self.comment.is_some()
    }

    /// Record findings under a fixed-organ heading.
    ///
    /// A second primary heading for the same organ merges into the first and
    /// records an anomaly. Returns `true` when a merge happened.
    pub fn add_fixed(&mut self, organ: Organ, text: &str) -> bool {
        let seen = std::mem::replace(&mut self.primary[organ.index()], true);
        let slot = &mut self.fixed[organ.index()];
        if seen {
            append_line(&mut slot.text, text);
            self.anomalies.push(format!(
                "Duplicate '{}' heading merged into first occurrence",
                organ.key()
            ));
            return true;
        }
        slot.reported = true;
        append_line(&mut slot.text, text);
        false
    }

    /// Append text to a fixed organ without duplicate detection
    /// (continuation lines and sub-headings such as CBD under GB).
    pub fn append_fixed(&mut self, organ: Organ, text: &str) {
        let slot = &mut self.fixed[organ.index()];
        slot.reported = true;
        append_line(&mut slot.text, text);
    }

    /// Record findings for an extra organ; returns its index.
    pub fn add_extra(&mut self, name: &str, text: &str) -> usize {
        let name = name.trim();
        if let Some(i) = self
            .extras
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
        {
            append_line(&mut self.extras[i].findings, text);
            self.anomalies.push(format!(
                "Duplicate extra organ '{}' merged into first occurrence",
                name
            ));
            return i;
        }
        self.extras.push(ExtraOrgan {
            name: name.to_string(),
            findings: text.trim().to_string(),
        });
        self.extras.len() - 1
    }

    pub fn append_extra(&mut self, index: usize, text: &str) {
        if let Some(extra) = self.extras.get_mut(index) {
            append_line(&mut extra.findings, text);
        }
    }

    pub fn append_comment(&mut self, text: &str) {
        let comment = self.comment.get_or_insert_with(String::new);
        append_line(comment, text);
    }

    pub fn record_anomaly(&mut self, message: impl Into<String>) {
        self.anomalies.push(message.into());
    }
}

fn append_line(target: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(text);
}

fn serialize_fixed<S: Serializer>(fixed: &[OrganFindings; 6], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(Organ::CANONICAL.iter().map(|o| (o.key(), &fixed[o.index()])))
}

/// True when every non-empty line is a no-pathology marker (`NP`, `normal`, ...).
///
/// Bullets, dashes and surrounding punctuation are ignored. Empty text is not
/// a marker.
pub fn is_no_pathology(text: &str) -> bool {
    let mut saw_marker = false;
    for line in text.lines() {
        let cleaned = line
            .trim_matches(|c: char| !c.is_alphanumeric())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if cleaned.is_empty() {
            continue;
        }
        if !NO_PATHOLOGY_MARKERS.contains(&cleaned.as_str()) {
            return false;
        }
        saw_marker = true;
    }
    saw_marker
}
