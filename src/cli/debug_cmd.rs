//! debug: dump every stage of the pipeline without running anything

use anyhow::Result;

use super::output::{join_ids, Output};
use super::Deployment;
use crate::domain::RunCommand;

pub fn run(deployment: &Deployment, command: RunCommand, output: &Output) -> Result<()> {
    let plan = (!deployment.is_noop()).then(|| deployment.plan(command));

    if output.is_json() {
        let stacks: Vec<_> = deployment.registry.stacks().collect();
        output.data(&serde_json::json!({
            "root": deployment.root,
            "env_dir": deployment.env_dir,
            "stacks": stacks,
            "request": deployment.request,
            "resolution": deployment.resolution,
            "selection": deployment.selection,
            "plan": plan,
        }));
        return Ok(());
    }

    println!("Repository: {}", deployment.root.display());
    println!("Environment: {}", deployment.relative(&deployment.env_dir).display());
    println!();

    println!("Stacks ({}):", deployment.registry.len());
    println!("{:<24} {:<32} {:<24} DIRECTORY", "ID", "AFTER", "BEFORE");
    println!("{}", "-".repeat(100));
    for stack in deployment.registry.stacks() {
        let mut id = stack.id.to_string();
        if !stack.aliases.is_empty() {
            id = format!("{} ({})", id, join_ids(&stack.aliases, ""));
        }
        println!(
            "{:<24} {:<32} {:<24} {}",
            id,
            join_ids(&stack.after, "-"),
            join_ids(&stack.before, "-"),
            deployment.relative(&stack.directory).display()
        );
    }
    println!();

    let request = &deployment.request;
    println!("Request:");
    println!("  targets: {}", join_ids(&request.targets, "all"));
    println!("  prune:   {}", join_ids(&request.prune, "none"));
    println!("  omit:    {}", join_ids(&request.omit, "none"));
    println!("  resolve: {}", request.resolve_dependencies);
    println!();

    let resolution = &deployment.resolution;
    println!("Resolution:");
    println!("  dependencies: {}", join_ids(&resolution.dependencies, "none"));
    for edge in &resolution.edges {
        println!("  {} -> {}", edge.from, edge.to);
    }
    if !resolution.unknown_targets.is_empty() {
        println!("  unknown targets: {}", join_ids(&resolution.unknown_targets, ""));
    }
    for cycle in &resolution.cycles {
        println!("  cycle: {}", join_ids(cycle, ""));
    }
    println!();

    let selection = &deployment.selection;
    println!("Selection:");
    println!("  selected: {}", join_ids(&selection.selected, "none"));
    println!("  pruned:   {}", join_ids(&selection.pruned, "none"));
    println!("  omitted:  {}", join_ids(&selection.omitted, "none"));
    println!();

    match plan {
        Some(plan) => {
            println!("Plan ({}, in {}):", command, deployment.relative(&plan.working_dir).display());
            for (i, line) in plan.commands().iter().enumerate() {
                println!("  {}. {}", i + 1, line);
            }
        }
        None => println!("Plan: nothing to do"),
    }

    Ok(())
}
