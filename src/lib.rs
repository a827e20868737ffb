//! stack-deploy - dependency-ordered deployment of infrastructure stacks
//!
//! Stacks declare which other stacks they must run `after` (and optionally
//! `before`). This crate resolves those relations for a selected subset,
//! applies prune/omit exclusions, and hands a single tag-scoped command
//! sequence to terramate.

pub mod domain;
pub mod storage;
pub mod exec;
pub mod cli;

pub use domain::{Edge, Node, Registry, Resolution, Selection, SelectionRequest, StackId};
