//! Global Constants
//!
//! Centralized constants for configuration and report rendering.

/// Report text constants
pub mod report {
    /// Header of the findings block
    pub const FINDINGS_HEADER: &str = "FINDINGS:";

    /// Header of the impression block
    pub const IMPRESSION_HEADER: &str = "IMPRESSION:";

    /// Impression text when every section is normal
    pub const NO_ABNORMALITY: &str = "No significant abnormality detected.";

    /// Phrase organ agents are told to use for normal findings
    pub const NO_ABNORMALITY_PHRASE: &str = "No significant abnormality detected";

    /// Tokens (after punctuation stripping) that mark a findings value as normal
    pub const NO_PATHOLOGY_MARKERS: &[&str] = &["np", "normal", "unremarkable", "no pathology"];
}

/// Batch document constants
pub mod batch {
    /// Width of the `=` rule around each patient header
    pub const HEADER_RULE_WIDTH: usize = 80;

    /// Separator between patients in the combined document
    pub const PATIENT_SEPARATOR: &str = "\n\n\n";

    /// Default output file name; `{date}` is substituted
    pub const DEFAULT_FILENAME_TEMPLATE: &str = "radiology_reports_{date}.txt";

    /// Default number of patients processed concurrently
    pub const DEFAULT_MAX_CONCURRENT_PATIENTS: usize = 4;

    /// Findings file extensions picked up from a batch folder
    pub const INPUT_EXTENSIONS: &[&str] = &["txt", "text"];
}

/// LLM defaults
pub mod llm {
    pub const DEFAULT_PROVIDER: &str = "gemini";

    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    /// Per-call timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    pub const DEFAULT_MAX_TOKENS: u32 = 2000;

    pub const DEFAULT_TEMPERATURE: f32 = 0.0;
}
