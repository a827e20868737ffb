//! Stack domain model
//!
//! A [`StackRecord`] is a decoded declaration as it appears on disk. A
//! [`Stack`] is the validated form held by the registry.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::id::{IdError, Reference, StackId};

/// A decoded stack declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackRecord {
    /// Human readable name (informational)
    pub name: Option<String>,

    /// Description (informational)
    pub description: Option<String>,

    /// Tags; the first `stack.` tag identifies the stack
    pub tags: Vec<String>,

    /// References this stack must run after
    pub after: Vec<String>,

    /// References this stack must run before
    pub before: Vec<String>,

    /// Directory the declaration was loaded from
    #[serde(skip)]
    pub directory: PathBuf,
}

impl StackRecord {
    /// Creates a record with a single identifying tag
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tags: vec![tag.into()],
            ..Self::default()
        }
    }

    /// Adds an `after` reference (builder style)
    pub fn after(mut self, reference: impl Into<String>) -> Self {
        self.after.push(reference.into());
        self
    }

    /// Adds a `before` reference (builder style)
    pub fn before(mut self, reference: impl Into<String>) -> Self {
        self.before.push(reference.into());
        self
    }

    /// Sets the directory (builder style)
    pub fn in_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Returns every tag in the stack namespace, in declared order
    pub fn stack_ids(&self) -> Result<Vec<StackId>, IdError> {
        self.tags
            .iter()
            .filter_map(|tag| StackId::from_tag(tag).transpose())
            .collect()
    }
}

/// A registered stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stack {
    pub id: StackId,

    /// Additional `stack.` tags on the same declaration
    pub aliases: Vec<StackId>,

    /// Stacks this one runs after, in declared order
    pub after: Vec<StackId>,

    /// Stacks this one runs before, in declared order
    pub before: Vec<StackId>,

    pub name: Option<String>,
    pub directory: PathBuf,
}

impl Stack {
    /// Builds a stack from a record whose canonical ID is already known.
    ///
    /// Only `tag:stack.*` references are kept; other entries never take part
    /// in resolution.
    pub(crate) fn from_record(
        id: StackId,
        aliases: Vec<StackId>,
        record: &StackRecord,
    ) -> Result<Self, IdError> {
        Ok(Self {
            id,
            aliases,
            after: stack_references(&record.after)?,
            before: stack_references(&record.before)?,
            name: record.name.clone(),
            directory: record.directory.clone(),
        })
    }
}

fn stack_references(raw: &[String]) -> Result<Vec<StackId>, IdError> {
    let mut ids = Vec::new();
    for entry in raw {
        if let Reference::Stack(id) = Reference::parse(entry)? {
            ids.push(id);
        }
    }
    Ok(ids)
}
