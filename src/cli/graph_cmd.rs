//! graph: resolved dependencies and edges

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::output::Output;
use super::Deployment;
use crate::domain::{GraphExport, NodeStatus};

pub fn run(deployment: &Deployment, dot: Option<&Path>, output: &Output) -> Result<()> {
    let export = GraphExport::new(&deployment.resolution, &deployment.selection);
    output.verbose_ctx(
        "graph",
        &format!("{} node(s), {} edge(s)", export.nodes.len(), export.edges.len()),
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "dependencies": deployment.selection.selected,
            "nodes": export.nodes,
            "edges": export.edges,
            "cycles": export.cycles,
            "run_order": export.run_order,
        }));
    } else {
        print_text(&export);
    }

    if let Some(path) = dot {
        fs::write(path, export.to_dot())
            .with_context(|| format!("Failed to write DOT file: {}", path.display()))?;
        output.success(&format!("Wrote graph to {}", path.display()));
    }

    Ok(())
}

fn print_text(export: &GraphExport) {
    println!("All Dependencies");
    for node in &export.nodes {
        match node.status {
            NodeStatus::Selected => println!("  {}", node.id),
            status => println!("  {} ({})", node.id, status.as_str()),
        }
    }

    println!("Edges");
    for edge in &export.edges {
        println!("  {} -> {}", edge.from, edge.to);
    }

    if let Some(order) = &export.run_order {
        println!("Run Order");
        for (i, id) in order.iter().enumerate() {
            println!("  {}. {}", i + 1, id);
        }
    }
}
