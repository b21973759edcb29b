//! Rendered organ sections and the ordered findings block.

use serde::Serialize;

/// How a section's text came about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionStatus {
    /// Fixed normal sentence, no external call
    Normal,
    /// Model-generated prose
    Generated,
    /// The agent failed; text is a placeholder
    Unavailable { reason: String },
}

/// One organ's prose. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganSection {
    label: String,
    text: String,
    status: SectionStatus,
}

impl OrganSection {
    pub fn normal(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            status: SectionStatus::Normal,
        }
    }

    pub fn generated(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            status: SectionStatus::Generated,
        }
    }

    /// Placeholder section: `Report unavailable for <label>: <reason>`
    pub fn unavailable(label: impl Into<String>, reason: impl Into<String>) -> Self {
        let label = label.into();
        let reason = reason.into();
        Self {
            text: format!("Report unavailable for {}: {}", label, reason),
            label,
            status: SectionStatus::Unavailable { reason },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> &SectionStatus {
        &self.status
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, SectionStatus::Unavailable { .. })
    }

    /// `<Label>: <text>`
    pub fn line(&self) -> String {
        format!("{}: {}", self.label, self.text)
    }
}

/// Sections in canonical order, then extras in extraction order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FindingsReport {
    sections: Vec<OrganSection>,
}

impl FindingsReport {
    pub fn new(sections: Vec<OrganSection>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[OrganSection] {
        &self.sections
    }

    pub fn labels(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.label()).collect()
    }

    pub fn get(&self, label: &str) -> Option<&OrganSection> {
        self.sections.iter().find(|s| s.label == label)
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &OrganSection> {
        self.sections.iter().filter(|s| s.is_unavailable())
    }

    /// One line per section, in collection order
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(OrganSection::line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
