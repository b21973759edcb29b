//! Batch Command
//!
//! Generate reports for every findings file in a folder and write one
//! combined document.
//!
//! Usage:
//!   radreport batch <DIR> [--date YYYY-MM-DD] [--output-dir DIR] [--provider P] [--model M]

use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::report::BatchRunner;
use crate::report::batch::today;
use crate::types::{ReportError, Result};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub dir: PathBuf,
    /// Date used in the output file name; defaults to today
    pub date: Option<String>,
    /// Overrides `output.output_dir`
    pub output_dir: Option<PathBuf>,
}

pub fn run(ctx: &CommandContext, options: BatchOptions, out: &Output) -> Result<()> {
    let date = match options.date {
        Some(date) => parse_date(&date)?,
        None => today(),
    };
    let output_dir = options
        .output_dir
        .unwrap_or_else(|| ctx.config.output.output_dir.clone());
    let file_name = ctx.config.output.batch_filename(&date);

    let client = ctx.client()?;
    out.info(&format!("Using {} ({})", client.name(), client.model()));
    let runner = BatchRunner::from_config(&ctx.config, client);

    let rt = Runtime::new()?;
    let summary = rt.block_on(runner.run_dir(&options.dir, &output_dir, &file_name))?;

    out.section("Batch");
    out.field("Patients", &summary.patients.to_string());
    out.field("Succeeded", &summary.succeeded.to_string());
    if !summary.failed.is_empty() {
        out.warning(&format!("Failed: {}", summary.failed.join(", ")));
    }
    if !summary.partial.is_empty() {
        out.warning(&format!(
            "With placeholder sections: {}",
            summary.partial.join(", ")
        ));
    }
    out.success(&format!("Written to {}", summary.output_path.display()));
    Ok(())
}

fn parse_date(date: &str) -> Result<String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| ReportError::Config(format!("Invalid date '{}', expected YYYY-MM-DD", date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-01-31").unwrap(), "2025-01-31");
        assert!(parse_date("31/01/2025").is_err());
    }
}
