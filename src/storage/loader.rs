//! Stack declaration loading
//!
//! Stacks are declared in terramate's own `stack.tm.hcl` files, anywhere below
//! the environment directory. Only the `stack` block is read; other blocks in
//! the file are ignored:
//!
//! ```hcl
//! stack {
//!   name  = "network"
//!   tags  = ["stack.network"]
//!   after = ["tag:stack.base"]
//! }
//! ```
//!
//! The same `stack` table is also accepted from `stack.toml`, `stack.yaml`,
//! `stack.yml` and `stack.json`. The directory containing the file is recorded
//! on the decoded record.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::domain::StackRecord;

/// Recognized declaration file names
pub const STACK_FILE_NAMES: [&str; 5] = [
    "stack.tm.hcl",
    "stack.toml",
    "stack.yaml",
    "stack.yml",
    "stack.json",
];

/// Directories never searched for declarations
const SKIPPED_DIRS: [&str; 2] = [".terraform", "node_modules"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Stack file has no top-level 'stack' section: {0}")]
    MissingStackSection(PathBuf),

    #[error("Environment directory not found: {0}")]
    MissingEnvironment(PathBuf),
}

#[derive(Debug, Deserialize)]
struct StackFile {
    stack: Option<StackRecord>,
}

/// Reads stack declarations below a directory
pub struct StackStore {
    dir: PathBuf,
}

impl StackStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory being searched
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns every declaration file, sorted by path
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(LoadError::MissingEnvironment(self.dir.clone()).into());
        }

        // Symlinks are not followed, so a link back up the tree is never walked.
        let walker = WalkDir::new(&self.dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| {
                format!("Failed to search for stacks in: {}", self.dir.display())
            })?;
            if entry.file_type().is_file() && is_stack_file(&entry) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Loads all declarations in path order
    pub fn read_all(&self) -> Result<Vec<StackRecord>> {
        self.discover()?
            .iter()
            .map(|path| read_record(path))
            .collect()
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name.starts_with('.') || SKIPPED_DIRS.contains(&&*name))
}

fn is_stack_file(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    STACK_FILE_NAMES.contains(&&*name)
}

/// Decodes one declaration file
pub fn read_record(path: &Path) -> Result<StackRecord> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read stack file: {}", path.display()))?;

    let file: StackFile = match path.extension().and_then(|ext| ext.to_str()) {
        Some("hcl") => hcl::from_str(&content)
            .with_context(|| format!("Failed to parse stack file: {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse stack file: {}", path.display()))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse stack file: {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse stack file: {}", path.display()))?,
    };

    let mut record = file
        .stack
        .ok_or_else(|| LoadError::MissingStackSection(path.to_path_buf()))?;
    record.directory = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    Ok(record)
}
