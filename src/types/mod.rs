pub mod error;
pub mod utils;

pub use error::{
    CompletionCategory, CompletionError, ErrorClassifier, ExtractionError, ExtractionFailure,
    ImpressionError, OrganAgentError, ReportError, Result,
};
pub use utils::{capitalize_first, collapse_whitespace, estimate_tokens, extract_json_object};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Identifier for one pipeline run, used for log correlation
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier for a patient within a batch (file stem of the findings file)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PatientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod newtype_tests {
    use super::*;

    #[test]
    fn test_run_id_is_unique() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_patient_id_display() {
        let id = PatientId::new("patient_12");
        assert_eq!(format!("{}", id), "patient_12");
    }
}
