//! Exclusion of stacks from a resolution
//!
//! Two independent mechanisms:
//!
//! | Mechanism | Scope | Effect |
//! |-----------|-------|--------|
//! | prune | graph | removes the stack and everything that depends on it |
//! | omit | selection | removes only the stack from the run; dependents stay |
//!
//! Prune is applied first, omit second.

use serde::Serialize;
use std::collections::BTreeSet;

use super::id::{Node, StackId};
use super::registry::Registry;
use super::resolver::{dependency_nodes, Edge, Resolution};

/// Per-invocation selection input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionRequest {
    /// Stacks to run; empty means all registered stacks
    pub targets: BTreeSet<StackId>,

    /// Stacks to exclude together with their dependents
    pub prune: BTreeSet<StackId>,

    /// Stacks to exclude individually
    pub omit: BTreeSet<StackId>,

    /// False when the caller asked to skip dependency resolution
    pub resolve_dependencies: bool,
}

impl Default for SelectionRequest {
    fn default() -> Self {
        Self {
            targets: BTreeSet::new(),
            prune: BTreeSet::new(),
            omit: BTreeSet::new(),
            resolve_dependencies: true,
        }
    }
}

impl SelectionRequest {
    pub fn new(targets: impl IntoIterator<Item = StackId>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_prune(mut self, ids: impl IntoIterator<Item = StackId>) -> Self {
        self.prune.extend(ids);
        self
    }

    pub fn with_omit(mut self, ids: impl IntoIterator<Item = StackId>) -> Self {
        self.omit.extend(ids);
        self
    }

    pub fn without_dependencies(mut self) -> Self {
        self.resolve_dependencies = false;
        self
    }

    /// Returns true if any prune or omit was requested
    pub fn has_exclusions(&self) -> bool {
        !self.prune.is_empty() || !self.omit.is_empty()
    }

    /// Rewrites aliases to canonical IDs; unknown IDs are kept as given
    pub fn normalized(&self, registry: &Registry) -> Self {
        let canonical = |ids: &BTreeSet<StackId>| -> BTreeSet<StackId> {
            ids.iter()
                .map(|id| registry.canonical(id).unwrap_or(id).clone())
                .collect()
        };
        Self {
            targets: canonical(&self.targets),
            prune: canonical(&self.prune),
            omit: canonical(&self.omit),
            resolve_dependencies: self.resolve_dependencies,
        }
    }
}

/// Returns the prune seeds plus every stack reachable from them along edges
pub fn pruned_nodes(edges: &BTreeSet<Edge>, seeds: &BTreeSet<StackId>) -> BTreeSet<StackId> {
    let mut pruned = BTreeSet::new();
    let mut pending: Vec<StackId> = seeds.iter().cloned().collect();

    while let Some(id) = pending.pop() {
        if !pruned.insert(id.clone()) {
            continue;
        }
        let node = Node::Stack(id);
        for edge in edges.iter().filter(|edge| edge.from == node) {
            if let Some(dependent) = edge.to.stack() {
                if !pruned.contains(dependent) {
                    pending.push(dependent.clone());
                }
            }
        }
    }

    pruned
}

/// Removes every edge leading into a pruned stack or one of its dependents
pub fn prune(edges: &BTreeSet<Edge>, seeds: &BTreeSet<StackId>) -> BTreeSet<Edge> {
    let pruned = pruned_nodes(edges, seeds);
    without_pruned(edges, &pruned)
}

fn without_pruned(edges: &BTreeSet<Edge>, pruned: &BTreeSet<StackId>) -> BTreeSet<Edge> {
    edges
        .iter()
        .filter(|edge| !edge.to.stack().is_some_and(|to| pruned.contains(to)))
        .cloned()
        .collect()
}

/// Removes omitted stacks from a selection; the graph is untouched
pub fn omit(dependencies: &BTreeSet<StackId>, omitted: &BTreeSet<StackId>) -> BTreeSet<StackId> {
    dependencies.difference(omitted).cloned().collect()
}

/// A resolution after exclusions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    /// Edges left after pruning
    pub edges: BTreeSet<Edge>,

    /// Stacks left after pruning
    pub dependencies: BTreeSet<StackId>,

    /// Stacks handed to the run command (after omitting)
    pub selected: BTreeSet<StackId>,

    /// Resolved stacks removed by pruning
    pub pruned: BTreeSet<StackId>,

    /// Resolved stacks removed by omitting
    pub omitted: BTreeSet<StackId>,
}

impl Selection {
    /// Applies prune, then omit, to a resolution
    pub fn apply(resolution: &Resolution, request: &SelectionRequest) -> Self {
        let pruned_all = pruned_nodes(&resolution.edges, &request.prune);
        let edges = without_pruned(&resolution.edges, &pruned_all);

        let mut dependencies = dependency_nodes(&edges);
        dependencies.extend(
            resolution
                .unknown_targets
                .difference(&pruned_all)
                .cloned(),
        );

        let selected = omit(&dependencies, &request.omit);
        let pruned = resolution
            .dependencies
            .intersection(&pruned_all)
            .cloned()
            .collect();
        let omitted = dependencies.intersection(&request.omit).cloned().collect();

        Self {
            edges,
            dependencies,
            selected,
            pruned,
            omitted,
        }
    }

    /// Selection for a run that skips dependency resolution: the targets
    /// themselves, minus pruned and omitted stacks
    pub fn unresolved(request: &SelectionRequest) -> Self {
        let dependencies: BTreeSet<StackId> =
            request.targets.difference(&request.prune).cloned().collect();
        let selected = omit(&dependencies, &request.omit);

        Self {
            edges: BTreeSet::new(),
            pruned: request.targets.intersection(&request.prune).cloned().collect(),
            omitted: dependencies.intersection(&request.omit).cloned().collect(),
            dependencies,
            selected,
        }
    }

    /// True when exclusions removed every stack. Such a run must do nothing,
    /// since an empty selector would otherwise select all stacks.
    pub fn is_noop(&self, request: &SelectionRequest) -> bool {
        self.selected.is_empty() && request.has_exclusions()
    }
}
