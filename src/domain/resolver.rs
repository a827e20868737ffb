//! Dependency resolution
//!
//! Computes the transitive closure of `after` relations for a set of target
//! stacks, and the edges that describe the required execution order.
//!
//! Edge direction is `prerequisite -> dependent`: an edge `(a, b)` means `a`
//! must complete before `b` starts. Stacks without a known prerequisite hang
//! off the synthetic [`Node::Root`].

use serde::Serialize;
use std::collections::BTreeSet;

use super::graph;
use super::id::{Node, StackId};
use super::registry::Registry;

/// An ordering constraint: `from` completes before `to` starts
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
}

impl Edge {
    pub fn new(from: impl Into<Node>, to: impl Into<Node>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates an edge from the synthetic root
    pub fn from_root(to: impl Into<Node>) -> Self {
        Self::new(Node::Root, to)
    }
}

/// Result of resolving a target set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    pub edges: BTreeSet<Edge>,

    /// Targets plus everything they transitively require
    pub dependencies: BTreeSet<StackId>,

    /// Requested targets that are not in the registry
    pub unknown_targets: BTreeSet<StackId>,

    /// Stacks that form dependency cycles; ordering is meaningless inside them
    pub cycles: Vec<Vec<StackId>>,
}

/// Takes `targets` as the whole dependency set without following any
/// relation. Targets the registry does not know are still reported.
pub fn targets_only(registry: &Registry, targets: &BTreeSet<StackId>) -> Resolution {
    Resolution {
        dependencies: targets.clone(),
        unknown_targets: unknown_targets(registry, targets),
        ..Resolution::default()
    }
}

fn unknown_targets(registry: &Registry, targets: &BTreeSet<StackId>) -> BTreeSet<StackId> {
    targets
        .iter()
        .filter(|target| !registry.contains(target))
        .cloned()
        .collect()
}

/// Resolves `targets` (all registered stacks when empty) against `registry`.
///
/// Unknown `after` references are skipped. A stack is never processed twice,
/// so cyclic declarations terminate with whatever edges were collected.
pub fn resolve(registry: &Registry, targets: &BTreeSet<StackId>) -> Resolution {
    let targets: BTreeSet<StackId> = if targets.is_empty() {
        registry.ids().cloned().collect()
    } else {
        targets
            .iter()
            .map(|target| registry.canonical(target).unwrap_or(target).clone())
            .collect()
    };

    let mut walker = Walker::new(registry);
    for target in &targets {
        walker.walk(target);
    }
    if registry.options().reverse_dependencies {
        walker.resolve_reverse();
    }

    let edges = walker.edges;
    let mut dependencies = dependency_nodes(&edges);
    let unknown_targets = unknown_targets(registry, &targets);
    // Bare targets have no edges at all; keep them selected.
    dependencies.extend(unknown_targets.iter().cloned());

    let cycles = graph::find_cycles(&edges);

    Resolution {
        edges,
        dependencies,
        unknown_targets,
        cycles,
    }
}

/// Returns every stack that appears as an edge endpoint
pub fn dependency_nodes(edges: &BTreeSet<Edge>) -> BTreeSet<StackId> {
    edges
        .iter()
        .flat_map(|edge| [edge.from.stack(), edge.to.stack()])
        .flatten()
        .cloned()
        .collect()
}

/// Worklist traversal state for one resolution
struct Walker<'a> {
    registry: &'a Registry,
    visited: BTreeSet<StackId>,
    edges: BTreeSet<Edge>,
}

impl<'a> Walker<'a> {
    fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            visited: BTreeSet::new(),
            edges: BTreeSet::new(),
        }
    }

    /// Follows `after` relations from `start`
    fn walk(&mut self, start: &StackId) {
        let registry = self.registry;
        let mut pending = vec![start.clone()];

        while let Some(id) = pending.pop() {
            if !self.visited.insert(id.clone()) {
                continue;
            }
            let Some(stack) = registry.get(&id) else {
                continue;
            };

            let mut has_prerequisite = false;
            for dep in &stack.after {
                let Some(dep) = registry.canonical(dep) else {
                    continue;
                };
                has_prerequisite = true;
                self.edges.insert(Edge::new(dep.clone(), id.clone()));
                if !self.visited.contains(dep) {
                    pending.push(dep.clone());
                }
            }

            if !has_prerequisite {
                self.edges.insert(Edge::from_root(id));
            }
        }
    }

    /// Pulls in stacks that declare `before` on a resolved stack, until no
    /// new edges appear.
    fn resolve_reverse(&mut self) {
        let registry = self.registry;

        loop {
            let mut added = false;
            for stack in registry.stacks() {
                for target in &stack.before {
                    let Some(target) = registry.canonical(target) else {
                        continue;
                    };
                    if !self.visited.contains(target) {
                        continue;
                    }
                    if self.edges.insert(Edge::new(stack.id.clone(), target.clone())) {
                        added = true;
                        self.walk(&stack.id);
                    }
                }
            }
            if !added {
                break;
            }
        }
    }
}
