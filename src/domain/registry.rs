//! Stack registry
//!
//! Maps stack IDs to their declarations. Built once per invocation from decoded
//! records and never mutated afterwards.
//!
//! Identification rules:
//! - The first `stack.` tag of a record is its canonical ID
//! - Further `stack.` tags are aliases that resolve to the canonical ID
//! - A later record with the same canonical ID replaces the earlier one;
//!   replaced IDs are reported through [`Registry::duplicates`]

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

use super::id::{IdError, Reference, StackId};
use super::stack::{Stack, StackRecord};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Stack declared in '{}' has no 'stack.' tag", .directory.display())]
    MissingStackTag { directory: PathBuf },

    #[error("Stack declared in '{}' has an invalid stack tag: {reason}", .directory.display())]
    InvalidTag { directory: PathBuf, reason: IdError },

    #[error(
        "Stack '{stack}' uses 'before = [\"{reference}\"]', but reverse dependencies are disabled \
         (set reverse_dependencies = true in deploy.toml, or use 'after' on the other stack)"
    )]
    ReverseDependencyUnsupported { stack: StackId, reference: String },
}

/// Options that change how declarations are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Honor `before` relations instead of rejecting them
    pub reverse_dependencies: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    stacks: BTreeMap<StackId, Stack>,
    aliases: BTreeMap<StackId, StackId>,
    duplicates: BTreeSet<StackId>,
    options: RegistryOptions,
}

impl Registry {
    /// Builds a registry from records in declaration order
    pub fn build<'a>(
        records: impl IntoIterator<Item = &'a StackRecord>,
        options: RegistryOptions,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self {
            options,
            ..Self::default()
        };

        for record in records {
            let invalid = |reason| RegistryError::InvalidTag {
                directory: record.directory.clone(),
                reason,
            };
            let mut ids = record.stack_ids().map_err(invalid)?.into_iter();
            let id = ids.next().ok_or_else(|| RegistryError::MissingStackTag {
                directory: record.directory.clone(),
            })?;
            let aliases: Vec<StackId> = ids.filter(|alias| *alias != id).collect();

            if !options.reverse_dependencies {
                for raw in &record.before {
                    let reference = Reference::parse(raw).map_err(invalid)?;
                    if reference.stack().is_some() {
                        return Err(RegistryError::ReverseDependencyUnsupported {
                            stack: id,
                            reference: reference.to_string(),
                        });
                    }
                }
            }

            let stack = Stack::from_record(id, aliases, record).map_err(invalid)?;
            registry.insert(stack);
        }

        Ok(registry)
    }

    fn insert(&mut self, stack: Stack) {
        if let Some(previous) = self.stacks.get(&stack.id) {
            for alias in &previous.aliases {
                if self.aliases.get(alias) == Some(&stack.id) {
                    self.aliases.remove(alias);
                }
            }
            self.duplicates.insert(stack.id.clone());
        }
        self.aliases.remove(&stack.id);
        for alias in &stack.aliases {
            if !self.stacks.contains_key(alias) {
                self.aliases.insert(alias.clone(), stack.id.clone());
            }
        }
        self.stacks.insert(stack.id.clone(), stack);
    }

    /// Resolves an ID or alias to the canonical ID
    pub fn canonical<'a>(&'a self, id: &'a StackId) -> Option<&'a StackId> {
        if let Some((key, _)) = self.stacks.get_key_value(id) {
            return Some(key);
        }
        self.aliases.get(id)
    }

    /// Looks up a stack by ID or alias
    pub fn get(&self, id: &StackId) -> Option<&Stack> {
        self.canonical(id).and_then(|id| self.stacks.get(id))
    }

    pub fn contains(&self, id: &StackId) -> bool {
        self.canonical(id).is_some()
    }

    /// Returns all canonical IDs in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &StackId> {
        self.stacks.keys()
    }

    /// Returns all stacks in ID order
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    /// IDs declared more than once (the last declaration was kept)
    pub fn duplicates(&self) -> &BTreeSet<StackId> {
        &self.duplicates
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
