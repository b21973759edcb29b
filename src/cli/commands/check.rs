//! Check Command
//!
//! Verify the configured provider is reachable with the configured model.

use tokio::runtime::Runtime;

use crate::ai::{CompletionCategory, CompletionError};
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub fn run(ctx: &CommandContext, out: &Output) -> Result<()> {
    let client = ctx.client()?;
    out.field("Provider", client.name());
    out.field("Model", client.model());
    out.field("Timeout", &format!("{}s", ctx.config.llm.timeout_secs));

    let rt = Runtime::new()?;
    if rt.block_on(client.health_check()) {
        out.success("Provider is available");
        Ok(())
    } else {
        Err(CompletionError::with_provider(
            CompletionCategory::Unavailable,
            format!("health check failed for model {}", client.model()),
            client.name(),
        )
        .into())
    }
}
