//! Graph views over resolved edges
//!
//! Cycle detection and run ordering use petgraph; the export types feed the
//! `graph` command (text, JSON and Graphviz DOT).

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use super::exclusion::Selection;
use super::id::{Node, StackId};
use super::resolver::{Edge, Resolution};

/// Builds a petgraph graph with nodes inserted in sorted order
fn build(edges: &BTreeSet<Edge>) -> DiGraph<Node, ()> {
    let mut graph = DiGraph::new();
    let mut indices: BTreeMap<&Node, NodeIndex> = BTreeMap::new();

    let nodes: BTreeSet<&Node> = edges.iter().flat_map(|e| [&e.from, &e.to]).collect();
    for node in nodes {
        indices.insert(node, graph.add_node(node.clone()));
    }
    for edge in edges {
        graph.add_edge(indices[&edge.from], indices[&edge.to], ());
    }

    graph
}

/// Returns the stacks of every dependency cycle, each sorted, in sorted order
pub fn find_cycles(edges: &BTreeSet<Edge>) -> Vec<Vec<StackId>> {
    let graph = build(edges);

    let mut cycles: Vec<Vec<StackId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || graph.contains_edge(component[0], component[0])
        })
        .map(|component| {
            let mut ids: Vec<StackId> = component
                .iter()
                .filter_map(|idx| graph[*idx].stack().cloned())
                .collect();
            ids.sort();
            ids
        })
        .collect();

    cycles.sort();
    cycles
}

/// Returns stacks in an order that satisfies every edge, or None if cyclic
pub fn run_order(edges: &BTreeSet<Edge>) -> Option<Vec<StackId>> {
    let graph = build(edges);
    let order = toposort(&graph, None).ok()?;

    Some(
        order
            .into_iter()
            .filter_map(|idx| graph[idx].stack().cloned())
            .collect(),
    )
}

/// How a resolved stack is treated by the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Selected,
    Omitted,
    Pruned,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Selected => "selected",
            NodeStatus::Omitted => "omitted",
            NodeStatus::Pruned => "pruned",
        }
    }

    fn dot_attributes(&self) -> &'static str {
        match self {
            NodeStatus::Selected => "style=filled, fillcolor=lightblue",
            NodeStatus::Omitted => "style=dotted",
            NodeStatus::Pruned => "style=dashed, color=grey, fontcolor=grey",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: StackId,
    pub status: NodeStatus,
}

/// Nodes with their selection status plus the full resolved edge set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
    pub cycles: Vec<Vec<StackId>>,

    /// Execution order of the selection, absent when it is cyclic
    pub run_order: Option<Vec<StackId>>,
}

impl GraphExport {
    pub fn new(resolution: &Resolution, selection: &Selection) -> Self {
        let nodes = resolution
            .dependencies
            .iter()
            .map(|id| {
                let status = if selection.pruned.contains(id) {
                    NodeStatus::Pruned
                } else if selection.omitted.contains(id) {
                    NodeStatus::Omitted
                } else {
                    NodeStatus::Selected
                };
                GraphNode {
                    id: id.clone(),
                    status,
                }
            })
            .collect();

        let run_order = run_order(&selection.edges).map(|order| {
            order
                .into_iter()
                .filter(|id| selection.selected.contains(id))
                .collect()
        });

        Self {
            nodes,
            edges: resolution.edges.iter().cloned().collect(),
            cycles: resolution.cycles.clone(),
            run_order,
        }
    }

    /// Renders a Graphviz DOT document
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph stacks {\n    rankdir=LR;\n");
        let _ = writeln!(dot, "    {} [shape=point];", quote(&Node::Root));

        for node in &self.nodes {
            let _ = writeln!(
                dot,
                "    {} [{}];",
                quote(&Node::Stack(node.id.clone())),
                node.status.dot_attributes()
            );
        }
        for edge in &self.edges {
            let _ = writeln!(dot, "    {} -> {};", quote(&edge.from), quote(&edge.to));
        }

        dot.push_str("}\n");
        dot
    }
}

fn quote(node: &Node) -> String {
    format!("\"{}\"", node.to_string().replace('\\', "\\\\").replace('"', "\\\""))
}
