//! # Storage Layer
//!
//! Everything that touches the filesystem before resolution starts.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Repository root | `.git` directory or file | nearest ancestor of the cwd |
//! | Stack declarations | TOML, YAML or JSON | `{env}/**/stack.{toml,yaml,yml,json}` |
//! | Project config | TOML | `deploy.toml` at the repository root |
//! | Global config | TOML | platform config dir, `config.toml` |
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point: repository root plus configuration
//! - [`StackStore`] - Discovers and decodes stack declarations
//! - [`Config`] - Project and global configuration

mod config;
mod loader;
mod project;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, PROJECT_CONFIG_FILE};
pub use loader::{read_record, LoadError, StackStore, STACK_FILE_NAMES};
pub use project::{Project, ProjectError};
