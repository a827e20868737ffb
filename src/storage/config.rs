//! Configuration handling for stack-deploy
//!
//! Configuration is stored in `deploy.toml` at the repository root (project)
//! and `~/.config/stack-deploy/config.toml` (global). Both files are optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RegistryOptions, Tools};

/// Project configuration file name, relative to the repository root
pub const PROJECT_CONFIG_FILE: &str = "deploy.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Environment directory, relative to the repository root
    pub env: String,

    /// Terraform workspace used when `--workspace` is not given
    pub workspace: String,

    /// Honor `before` relations in stack declarations
    pub reverse_dependencies: bool,

    /// Default parallelism hint for terramate
    pub parallel: Option<usize>,

    /// Default remote state bucket
    pub backend_bucket: Option<String>,

    /// Var files always passed to terraform, relative to the repository root
    pub var_files: Vec<PathBuf>,

    /// External program names
    pub tools: Tools,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            env: "stacks".to_string(),
            workspace: "default".to_string(),
            reverse_dependencies: false,
            parallel: None,
            backend_bucket: None,
            var_files: vec![],
            tools: Tools::default(),
        }
    }
}

impl ProjectConfig {
    /// Returns the registry options this configuration implies
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            reverse_dependencies: self.reverse_dependencies,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.env.trim().is_empty() {
            return Err(ConfigError::Invalid("env must not be empty".to_string()));
        }
        if Path::new(&self.env).is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "env must be relative to the repository root, got '{}'",
                self.env
            )));
        }
        if self.parallel == Some(0) {
            return Err(ConfigError::Invalid("parallel must be at least 1".to_string()));
        }
        if self.tools.terramate.is_empty() || self.tools.terraform.is_empty() {
            return Err(ConfigError::Invalid("tool names must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads the global configuration only
    pub fn global_only() -> Result<Self> {
        Ok(Self {
            project: ProjectConfig::default(),
            global: Self::load_global()?,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self { project, global })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "stack-deploy", "stack-deploy")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;
        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;

        Ok(config)
    }
}
