//! Extract Command
//!
//! Print the structured findings for one patient as JSON, without generating
//! any prose.
//!
//! Usage:
//!   radreport extract [INPUT|-]

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, read_input};
use crate::config::ExtractorKind;
use crate::report::{FieldExtractor, HeadingExtractor, LlmExtractor};
use crate::types::Result;

pub fn run(ctx: &CommandContext, input: Option<PathBuf>, out: &Output) -> Result<()> {
    let raw = read_input(input.as_deref())?;
    let pipeline = &ctx.config.pipeline;

    // The heading extractor is local; only the splitter needs a provider.
    let extractor: Box<dyn FieldExtractor> = match pipeline.extractor {
        ExtractorKind::Heading => {
            Box::new(HeadingExtractor::new().with_extra_headings(&pipeline.extra_headings))
        }
        ExtractorKind::Llm => Box::new(LlmExtractor::new(ctx.client()?, ctx.config.llm.timeout())),
    };
    out.info(&format!("Extractor: {}", extractor.name()));

    let rt = Runtime::new()?;
    let findings = rt.block_on(extractor.extract(&raw))?;

    for anomaly in findings.anomalies() {
        out.warning(anomaly);
    }
    println!("{}", serde_json::to_string_pretty(&findings)?);
    Ok(())
}
