//! Batch reporting over a folder of findings files.
//!
//! One file per patient; the patient id is the file stem. Files are ordered by
//! the first number in their name, then by name. Patients run with bounded
//! concurrency and the combined document keeps that order. A failed patient
//! gets a `REPORT FAILED` body and does not affect the others.

use futures::StreamExt;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use super::orchestrator::{FinalReport, ReportOrchestrator};
use crate::ai::SharedClient;
use crate::config::Config;
use crate::constants::batch::{HEADER_RULE_WIDTH, INPUT_EXTENSIONS, PATIENT_SEPARATOR};
use crate::types::{PatientId, ReportError, Result};

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid number regex"));

/// One findings file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientInput {
    pub id: PatientId,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct PatientOutcome {
    pub id: PatientId,
    pub result: Result<FinalReport>,
}

impl PatientOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Header block followed by the report or the failure line
    pub fn render(&self) -> String {
        let rule = "=".repeat(HEADER_RULE_WIDTH);
        let body = match &self.result {
            Ok(report) => report.render(),
            Err(e) => format!("REPORT FAILED: {}", e),
        };
        format!("{}\nPATIENT {}\n{}\n\n{}", rule, self.id, rule, body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub patients: usize,
    pub succeeded: usize,
    pub failed: Vec<String>,
    /// Patients whose report carries placeholder sections
    pub partial: Vec<String>,
    pub output_path: PathBuf,
}

pub struct BatchRunner {
    orchestrator: Arc<ReportOrchestrator>,
    max_concurrent: usize,
}

impl BatchRunner {
    pub fn new(orchestrator: Arc<ReportOrchestrator>, max_concurrent: usize) -> Self {
        Self {
            orchestrator,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn from_config(config: &Config, client: SharedClient) -> Self {
        Self::new(
            Arc::new(ReportOrchestrator::from_config(config, client)),
            config.batch.max_concurrent_patients,
        )
    }

    /// Findings files in `dir`, in patient order
    pub fn discover(dir: &Path) -> Result<Vec<PatientInput>> {
        if !dir.is_dir() {
            return Err(ReportError::Input {
                path: dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let mut inputs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || !has_input_extension(&path) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::debug!("Batch: skipping non-UTF-8 file name {}", path.display());
                continue;
            };
            inputs.push(PatientInput {
                id: PatientId::new(id),
                path: path.clone(),
            });
        }

        inputs.sort_by(|a, b| patient_order(a.id.as_str(), b.id.as_str()));
        Ok(inputs)
    }

    /// Run every patient; outcomes keep input order
    pub async fn run(&self, inputs: Vec<PatientInput>) -> Vec<PatientOutcome> {
        let total = inputs.len();
        tracing::info!(
            "Batch: {} patients, up to {} at a time",
            total,
            self.max_concurrent
        );

        futures::stream::iter(inputs.into_iter().enumerate())
            .map(|(i, input)| {
                let orchestrator = Arc::clone(&self.orchestrator);
                async move {
                    tracing::info!("Batch: patient {} ({}/{})", input.id, i + 1, total);
                    let result = process(&orchestrator, &input.path).await;
                    if let Err(e) = &result {
                        tracing::warn!("Batch: patient {} failed: {}", input.id, e);
                    }
                    PatientOutcome {
                        id: input.id,
                        result,
                    }
                }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// Combined document for all outcomes
    pub fn render(outcomes: &[PatientOutcome]) -> String {
        outcomes
            .iter()
            .map(PatientOutcome::render)
            .collect::<Vec<_>>()
            .join(PATIENT_SEPARATOR)
    }

    /// Discover, run and write `<output_dir>/<file_name>`
    pub async fn run_dir(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        file_name: &str,
    ) -> Result<BatchSummary> {
        let inputs = Self::discover(input_dir)?;
        if inputs.is_empty() {
            return Err(ReportError::Input {
                path: input_dir.display().to_string(),
                message: format!("no findings files ({})", INPUT_EXTENSIONS.join(", ")),
            });
        }

        let outcomes = self.run(inputs).await;

        std::fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(file_name);
        let mut document = Self::render(&outcomes);
        document.push('\n');
        tokio::fs::write(&output_path, document).await?;

        let failed: Vec<String> = outcomes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.id.to_string())
            .collect();
        let partial: Vec<String> = outcomes
            .iter()
            .filter(|o| o.result.as_ref().is_ok_and(|r| !r.is_complete()))
            .map(|o| o.id.to_string())
            .collect();

        tracing::info!(
            "Batch: wrote {} ({} ok, {} failed)",
            output_path.display(),
            outcomes.len() - failed.len(),
            failed.len()
        );

        Ok(BatchSummary {
            patients: outcomes.len(),
            succeeded: outcomes.len() - failed.len(),
            failed,
            partial,
            output_path,
        })
    }
}

async fn process(orchestrator: &ReportOrchestrator, path: &Path) -> Result<FinalReport> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ReportError::Input {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(orchestrator.build_report(&raw).await?)
}

fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| INPUT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

fn first_number(name: &str) -> Option<u64> {
    FIRST_NUMBER
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
}

/// Numbered names first, by number; then by name.
fn patient_order(a: &str, b: &str) -> Ordering {
    match (first_number(a), first_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Batch date label, local time
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
