//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (`$XDG_CONFIG_HOME/radreport/config.toml`)
//! 3. Project config (`.radreport/config.toml`)
//! 4. Explicit `--config` file
//! 5. Environment variables (`RADREPORT_` prefix, nested keys split on `__`)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ReportError, Result};

const ENV_PREFIX: &str = "RADREPORT_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_with(None)
    }

    /// Like `load`, with an explicit file layered above the project config
    pub fn load_with(explicit: Option<&Path>) -> Result<Config> {
        let global = Self::global_config_path().filter(|p| p.exists());
        let project = Some(Self::project_config_path()).filter(|p| p.exists());

        if let Some(path) = explicit
            && !path.exists()
        {
            return Err(ReportError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config: Config = Self::figment(global.as_deref(), project.as_deref(), explicit)
            .extract()
            .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only (no env, no global)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in [global, project, explicit].into_iter().flatten() {
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // RADREPORT_LLM__MODEL -> llm.model
        figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("radreport"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".radreport")
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration; returns the config file path
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            ReportError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&global_dir, force)
    }

    /// Initialize project configuration; returns the config file path
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_default(&Self::project_dir(), force)
    }

    fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config_toml()?)?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Default config file content (TOML)
    pub fn default_config_toml() -> Result<String> {
        let body = toml::to_string_pretty(&Config::default())?;
        Ok(format!(
            "# radreport configuration\n\
             # Project settings in .radreport/config.toml override the global file.\n\
             # API keys: set GOOGLE_API_KEY / OPENAI_API_KEY, or llm.api_key here.\n\n{}",
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorKind;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let config = ConfigLoader::load().unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_layering_order() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("project.toml");
        fs::write(
            &global,
            "[llm]\nprovider = \"openai\"\ntimeout_secs = 10\n",
        )
        .unwrap();
        fs::write(&project, "[llm]\ntimeout_secs = 20\n[pipeline]\nextractor = \"llm\"\n").unwrap();

        let config: Config = ConfigLoader::figment(Some(&global), Some(&project), None)
            .extract()
            .unwrap();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.timeout_secs, 20);
        assert_eq!(config.pipeline.extractor, ExtractorKind::Llm);
        assert_eq!(config.llm.max_tokens, 2000);
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[batch]\nmax_concurrent_patients = 0\n").unwrap();

        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::load_with(Some(Path::new("/nonexistent/radreport.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_default_config_toml_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, ConfigLoader::default_config_toml().unwrap()).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.provider, "gemini");
        assert!(config.pipeline.short_circuit_normal);
    }

    #[test]
    fn test_env_override() {
        // SAFETY: key is unique to this test
        unsafe {
            std::env::set_var("RADREPORT_OUTPUT__BATCH_FILENAME_TEMPLATE", "env_{date}.txt");
        }
        let config: Config = ConfigLoader::figment(None, None, None).extract().unwrap();
        assert_eq!(config.output.batch_filename_template, "env_{date}.txt");
        unsafe {
            std::env::remove_var("RADREPORT_OUTPUT__BATCH_FILENAME_TEMPLATE");
        }
    }
}
