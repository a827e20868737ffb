//! Project discovery
//!
//! A project is the git repository containing the current directory. Stack
//! declarations live in an environment directory below its root.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use super::{Config, StackStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(".git could not be found in {0} or any parent directory")]
    NotInRepository(PathBuf),
}

/// A repository with stack declarations
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens the project rooted at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the repository containing the current directory
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let root = Self::find_root(&cwd).ok_or(ProjectError::NotInRepository(cwd))?;

        Self::open(root)
    }

    /// Finds the nearest ancestor (or `start` itself) containing `.git`
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(".git").exists())
            .map(Path::to_path_buf)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the environment directory, using the configured default when
    /// `env` is None
    pub fn env_dir(&self, env: Option<&str>) -> PathBuf {
        let env = env.unwrap_or(&self.config.project.env);
        self.root.join(env)
    }

    /// Returns the stack store for an environment
    pub fn stack_store(&self, env: Option<&str>) -> StackStore {
        StackStore::new(self.env_dir(env))
    }

    /// Resolves a path from the project config against the root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
