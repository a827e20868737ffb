//! The per-invocation pipeline shared by all commands:
//! load declarations, build the registry, resolve, then apply exclusions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::app::SelectionArgs;
use super::output::{join_ids, Output};
use crate::domain::{
    plan, resolve, targets_only, ExecutionPlan, PlanOptions, Registry, Resolution, RunCommand,
    Selection, SelectionRequest,
};
use crate::storage::Project;

/// Everything computed for one invocation
pub struct Deployment {
    pub root: PathBuf,
    pub env_dir: PathBuf,
    pub registry: Registry,
    pub request: SelectionRequest,
    pub resolution: Resolution,
    pub selection: Selection,
    pub options: PlanOptions,
}

impl Deployment {
    pub fn load(project: &Project, args: &SelectionArgs, output: &Output) -> Result<Self> {
        let store = project.stack_store(args.env.as_deref());
        let env_dir = store.dir().to_path_buf();
        output.verbose_ctx("load", &format!("Searching stacks in: {}", env_dir.display()));

        let records = store.read_all()?;
        output.verbose_ctx("load", &format!("Found {} stack declaration(s)", records.len()));

        let registry_options = project.config().project.registry_options();
        let registry = Registry::build(&records, registry_options)
            .context("Failed to build stack registry")?;
        if !registry.duplicates().is_empty() {
            output.warn(&format!(
                "Stack(s) declared more than once, the last declaration wins: {}",
                join_ids(registry.duplicates(), "")
            ));
        }

        let request = args.request().normalized(&registry);
        let (resolution, selection) = if request.resolve_dependencies {
            let resolution = resolve(&registry, &request.targets);
            let selection = Selection::apply(&resolution, &request);
            (resolution, selection)
        } else {
            output.verbose_ctx("resolve", "Dependency resolution skipped (--nodeps)");
            let resolution = targets_only(&registry, &request.targets);
            (resolution, Selection::unresolved(&request))
        };

        if !resolution.unknown_targets.is_empty() {
            output.warn(&format!(
                "Unknown stack(s) requested: {}",
                join_ids(&resolution.unknown_targets, "")
            ));
        }
        for cycle in &resolution.cycles {
            output.warn(&format!(
                "Dependency cycle between {}; their relative order is not guaranteed",
                join_ids(cycle, "")
            ));
        }
        output.verbose_ctx(
            "resolve",
            &format!(
                "Resolved {} stack(s), {} edge(s)",
                resolution.dependencies.len(),
                resolution.edges.len()
            ),
        );
        output.verbose_ctx(
            "select",
            &format!(
                "Selected: {}; pruned: {}; omitted: {}",
                join_ids(&selection.selected, "none"),
                join_ids(&selection.pruned, "none"),
                join_ids(&selection.omitted, "none")
            ),
        );

        let options = plan_options(project, args, env_dir.clone())?;

        Ok(Self {
            root: project.root().to_path_buf(),
            env_dir,
            registry,
            request,
            resolution,
            selection,
            options,
        })
    }

    /// True when exclusions left nothing to run
    pub fn is_noop(&self) -> bool {
        self.selection.is_noop(&self.request)
    }

    /// Plans `command` over the final selection
    pub fn plan(&self, command: RunCommand) -> ExecutionPlan {
        plan(&self.selection.selected, command, &self.options)
    }

    /// Returns `path` relative to the repository root when possible
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Merges command-line flags over the project configuration
fn plan_options(project: &Project, args: &SelectionArgs, working_dir: PathBuf) -> Result<PlanOptions> {
    let config = &project.config().project;

    let parallel = args.parallel.or(config.parallel);
    if parallel == Some(0) {
        anyhow::bail!("--parallel must be at least 1");
    }

    let cwd = std::env::current_dir()?;
    let mut var_files: Vec<PathBuf> = config
        .var_files
        .iter()
        .map(|path| project.resolve_path(path))
        .collect();
    var_files.extend(args.var_files.iter().map(|path| cwd.join(path)));

    Ok(PlanOptions {
        working_dir,
        workspace: args
            .workspace
            .clone()
            .unwrap_or_else(|| config.workspace.clone()),
        unattended: args.unattended,
        parallel,
        init: !args.noinit,
        var_files,
        backend_bucket: args
            .backend_bucket
            .clone()
            .or_else(|| config.backend_bucket.clone()),
        tools: config.tools.clone(),
    })
}
