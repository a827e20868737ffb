//! Stack identifiers and dependency references
//!
//! Formats:
//! - Stack tag: `stack.{name}` (e.g., `stack.network`)
//! - Stack ID: the bare `{name}` part of the tag (e.g., `network`)
//! - Dependency reference: `tag:{tag}` (e.g., `tag:stack.network`)
//!
//! Tags are parsed once at the data-model boundary; the rest of the crate only
//! sees [`StackId`], [`Node`] and [`Reference`] values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace prefix that marks a tag as a stack identifier
pub const STACK_TAG_PREFIX: &str = "stack.";

/// Prefix that marks a dependency entry as a tag reference
pub const TAG_REFERENCE_PREFIX: &str = "tag:";

/// Display name of the synthetic root node
pub const ROOT_NODE_NAME: &str = "__root__";

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid stack ID: '{0}' (expected a non-empty name without commas or whitespace)")]
    InvalidStackId(String),

    #[error("'{0}' is reserved for the synthetic root node")]
    Reserved(String),
}

/// Identifier of a stack, stored without its `stack.` namespace
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StackId(String);

impl StackId {
    /// Creates a stack ID from a bare name
    pub fn new(name: &str) -> Result<Self, IdError> {
        let name = name.trim();
        if name.is_empty() || name.contains(',') || name.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidStackId(name.to_string()));
        }
        if name == ROOT_NODE_NAME {
            return Err(IdError::Reserved(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Parses a tag in the `stack.` namespace.
    ///
    /// Returns `Ok(None)` for tags outside the namespace and an error for a
    /// `stack.` tag whose name is not a valid ID.
    pub fn from_tag(tag: &str) -> Result<Option<Self>, IdError> {
        tag.trim()
            .strip_prefix(STACK_TAG_PREFIX)
            .map(Self::new)
            .transpose()
    }

    /// Returns the bare name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the namespaced tag form used by terramate selectors
    pub fn tag(&self) -> String {
        format!("{}{}", STACK_TAG_PREFIX, self.0)
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts both `network` and `stack.network`
impl FromStr for StackId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::new(s.strip_prefix(STACK_TAG_PREFIX).unwrap_or(s))
    }
}

impl TryFrom<String> for StackId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StackId> for String {
    fn from(id: StackId) -> Self {
        id.0
    }
}

/// A node of the execution graph
///
/// `Root` precedes every stack without known prerequisites, so a topological
/// run always has a single starting point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub enum Node {
    Root,
    Stack(StackId),
}

impl Node {
    /// Returns the stack ID, or None for the root sentinel
    pub fn stack(&self) -> Option<&StackId> {
        match self {
            Node::Root => None,
            Node::Stack(id) => Some(id),
        }
    }

}

impl From<StackId> for Node {
    fn from(id: StackId) -> Self {
        Node::Stack(id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Root => f.write_str(ROOT_NODE_NAME),
            Node::Stack(id) => id.fmt(f),
        }
    }
}

impl From<Node> for String {
    fn from(node: Node) -> Self {
        node.to_string()
    }
}

/// A parsed `after`/`before` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `tag:stack.{name}`
    Stack(StackId),
    /// `tag:{tag}` outside the stack namespace
    Tag(String),
    /// Anything that is not a tag reference (paths, globs)
    Other(String),
}

impl Reference {
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let raw = raw.trim();
        let reference = match raw.strip_prefix(TAG_REFERENCE_PREFIX) {
            Some(tag) => match StackId::from_tag(tag)? {
                Some(id) => Reference::Stack(id),
                None => Reference::Tag(tag.to_string()),
            },
            None => Reference::Other(raw.to_string()),
        };
        Ok(reference)
    }

    /// Returns the referenced stack, if this is a stack reference
    pub fn stack(&self) -> Option<&StackId> {
        match self {
            Reference::Stack(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Stack(id) => write!(f, "{}{}", TAG_REFERENCE_PREFIX, id.tag()),
            Reference::Tag(tag) => write!(f, "{}{}", TAG_REFERENCE_PREFIX, tag),
            Reference::Other(raw) => f.write_str(raw),
        }
    }
}
