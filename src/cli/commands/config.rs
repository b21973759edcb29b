//! Config Command
//!
//! Manage radreport configuration.
//!
//! Usage:
//!   radreport config show [-f json]
//!   radreport config path
//!   radreport config init [-g] [--force]

use super::OutputFormat;
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Show the effective configuration (defaults, files, env and flags merged)
pub fn show(ctx: &CommandContext, format: OutputFormat) -> Result<()> {
    println!("{}", render(&ctx.config, format)?);
    Ok(())
}

fn render(config: &Config, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => toml::to_string_pretty(config)?,
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
    })
}

/// Show configuration file locations in precedence order
pub fn path(out: &Output) -> Result<()> {
    out.section("Configuration files (later wins)");
    match ConfigLoader::global_config_path() {
        Some(global) => out.field("Global", &describe(&global)),
        None => out.field("Global", "(cannot determine config directory)"),
    }
    out.field("Project", &describe(&ConfigLoader::project_config_path()));
    out.field("Env", "RADREPORT_<SECTION>__<KEY>, e.g. RADREPORT_LLM__MODEL");
    Ok(())
}

fn describe(path: &std::path::Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}

pub fn init(global: bool, force: bool, out: &Output) -> Result<()> {
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };
    out.success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    out.field("Config", &path.display().to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_never_includes_api_key() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret-key".to_string());

        let text = render(&config, OutputFormat::Text).unwrap();
        let json = render(&config, OutputFormat::Json).unwrap();

        assert!(text.contains("[llm]"));
        assert!(!text.contains("secret-key"));
        assert!(!json.contains("secret-key"));
    }
}
