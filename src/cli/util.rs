//! CLI Common Utilities
//!
//! Shared config loading, client construction and input reading for command
//! handlers.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::ai::{SharedClient, create_client};
use crate::config::{Config, ConfigLoader};
use crate::types::{ReportError, Result};

/// Provider/model flags shared by the generating commands
#[derive(Debug, Clone, Default)]
pub struct LlmOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Command execution context
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Effective configuration (files, env and CLI overrides merged)
    pub config: Config,
}

impl CommandContext {
    /// Load configuration, honouring an explicit `--config` file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = ConfigLoader::load_with(config_path)?;
        Ok(Self { config })
    }

    /// Apply `--provider` / `--model`. A provider change without a model
    /// falls back to that provider's default model.
    pub fn with_overrides(mut self, overrides: &LlmOverrides) -> Result<Self> {
        if let Some(provider) = &overrides.provider
            && !provider.eq_ignore_ascii_case(&self.config.llm.provider)
        {
            self.config.llm.provider = provider.to_lowercase();
            self.config.llm.model = None;
            self.config.llm.api_base = None;
        }
        if let Some(model) = &overrides.model {
            self.config.llm.model = Some(model.clone());
        }
        self.config.validate()?;
        Ok(self)
    }

    pub fn client(&self) -> Result<SharedClient> {
        create_client(&self.config.llm.to_provider_config())
    }
}

/// Read findings from a file, or stdin for `-` / no path
pub fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).map_err(|e| ReportError::Input {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| ReportError::Input {
                    path: "<stdin>".to_string(),
                    message: e.to_string(),
                })?;
            Ok(buffer)
        }
    }
}

/// Resolve an output file, creating its parent directory
pub fn prepare_output(path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_provider_override_resets_model() {
        let mut config = Config::default();
        config.llm.model = Some("gemini-2.5-pro".to_string());
        let ctx = CommandContext { config }
            .with_overrides(&LlmOverrides {
                provider: Some("OpenAI".to_string()),
                model: None,
            })
            .unwrap();

        assert_eq!(ctx.config.llm.provider, "openai");
        assert_eq!(ctx.config.llm.model, None);
    }

    #[test]
    fn test_model_override_keeps_provider() {
        let ctx = CommandContext {
            config: Config::default(),
        }
        .with_overrides(&LlmOverrides {
            provider: Some("gemini".to_string()),
            model: Some("gemini-2.5-pro".to_string()),
        })
        .unwrap();

        assert_eq!(ctx.config.llm.provider, "gemini");
        assert_eq!(ctx.config.llm.model.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn test_read_input_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_input(Some(&dir.path().join("missing.txt"))).unwrap_err();
        assert!(matches!(err, ReportError::Input { .. }));
    }

    #[test]
    fn test_prepare_output_creates_parent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out/report.txt");
        prepare_output(&target).unwrap();
        assert!(dir.path().join("out").is_dir());
    }
}
