//! Report Command
//!
//! Generate a report for one patient.
//!
//! Usage:
//!   radreport report [INPUT|-] [-o FILE] [--provider P] [--model M] [--format text|json]

use std::path::PathBuf;

use tokio::runtime::Runtime;

use super::OutputFormat;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, prepare_output, read_input};
use crate::report::{FinalReport, ReportOrchestrator};
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Findings file; stdin when absent or `-`
    pub input: Option<PathBuf>,
    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
}

pub fn run(ctx: &CommandContext, options: ReportOptions, out: &Output) -> Result<()> {
    let raw = read_input(options.input.as_deref())?;
    let client = ctx.client()?;
    out.info(&format!(
        "Using {} ({})",
        client.name(),
        client.model()
    ));

    let orchestrator = ReportOrchestrator::from_config(&ctx.config, client);
    let rt = Runtime::new()?;
    let report = rt.block_on(orchestrator.build_report(&raw))?;

    let rendered = render(&report, options.format)?;
    match &options.output {
        Some(path) => {
            let path = prepare_output(path)?;
            std::fs::write(&path, format!("{}\n", rendered))?;
            out.success(&format!("Report written to {}", path.display()));
        }
        None => println!("{}", rendered),
    }

    for label in report.failures() {
        out.warning(&format!("{} fell back to a placeholder", label));
    }
    out.section("Usage");
    for line in report.usage.display().lines() {
        out.info(line);
    }
    Ok(())
}

fn render(report: &FinalReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => report.render(),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    })
}
