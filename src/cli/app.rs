//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use super::output::{Output, OutputFormat};
use super::{debug_cmd, graph_cmd, run_cmd, Deployment};
use crate::domain::{RunCommand, SelectionRequest, StackId};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "deploy")]
#[command(author, version, about = "Run terramate stacks in dependency order")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Stack selection and run options shared by every command
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Stack to run, with its prerequisites (repeatable; default: all stacks)
    #[arg(long = "stack", short = 's', global = true, value_name = "STACK")]
    pub stacks: Vec<StackId>,

    /// Stack to leave out of the run; its dependents still run (repeatable)
    #[arg(long = "omit", global = true, value_name = "STACK")]
    pub omit: Vec<StackId>,

    /// Stack to leave out together with everything that depends on it (repeatable)
    #[arg(long = "prune", global = true, value_name = "STACK")]
    pub prune: Vec<StackId>,

    /// Terraform workspace (default: "default", or the project config)
    #[arg(long, short = 'w', global = true)]
    pub workspace: Option<String>,

    /// Do not ask for confirmation (passes -auto-approve)
    #[arg(long, global = true)]
    pub unattended: bool,

    /// Number of stacks terramate may run in parallel
    #[arg(long, global = true, value_name = "N")]
    pub parallel: Option<usize>,

    /// Skip `terraform init` and workspace selection
    #[arg(long, global = true)]
    pub noinit: bool,

    /// Var file passed to terraform (repeatable)
    #[arg(long = "var-file", global = true, value_name = "FILE")]
    pub var_files: Vec<PathBuf>,

    /// Remote state bucket passed to `terraform init`
    #[arg(long, global = true, value_name = "BUCKET")]
    pub backend_bucket: Option<String>,

    /// Environment directory relative to the repository root (default: "stacks")
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Run only the given stacks, without their prerequisites
    #[arg(long, global = true, requires = "stacks")]
    pub nodeps: bool,

    /// Print the commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl SelectionArgs {
    /// Builds the selection request (IDs as given, not yet canonical)
    pub fn request(&self) -> SelectionRequest {
        let request = SelectionRequest::new(self.stacks.iter().cloned())
            .with_prune(self.prune.iter().cloned())
            .with_omit(self.omit.iter().cloned());

        if self.nodeps {
            request.without_dependencies()
        } else {
            request
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply the selected stacks in dependency order
    Apply,

    /// Destroy the selected stacks in reverse dependency order
    Destroy,

    /// Show the terraform plan for the selected stacks
    Plan,

    /// Show the resolved dependency graph
    Graph {
        /// Also write a Graphviz DOT file
        #[arg(long, value_name = "FILE")]
        dot: Option<PathBuf>,
    },

    /// Show the registry, resolution and planned commands without running anything
    Debug {
        /// Command to plan
        #[arg(long, value_enum, default_value = "apply")]
        command: PlannedCommand,
    },
}

/// Terraform command selectable for `debug`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlannedCommand {
    Apply,
    Plan,
    Destroy,
}

impl From<PlannedCommand> for RunCommand {
    fn from(command: PlannedCommand) -> Self {
        match command {
            PlannedCommand::Apply => RunCommand::Apply,
            PlannedCommand::Plan => RunCommand::Plan,
            PlannedCommand::Destroy => RunCommand::Destroy,
        }
    }
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = match cli.format {
        Some(format) => format,
        None => Config::global_only()?.global.default_format.into(),
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("deploy starting");

    let project = Project::open_current()?;
    output.verbose_ctx(
        "project",
        &format!("Repository root: {}", project.root().display()),
    );

    let deployment = Deployment::load(&project, &cli.selection, &output)?;

    match cli.command {
        Commands::Apply => run_cmd::run(&deployment, RunCommand::Apply, cli.selection.dry_run, &output)?,
        Commands::Destroy => {
            run_cmd::run(&deployment, RunCommand::Destroy, cli.selection.dry_run, &output)?
        }
        Commands::Plan => run_cmd::run(&deployment, RunCommand::Plan, cli.selection.dry_run, &output)?,
        Commands::Graph { dot } => graph_cmd::run(&deployment, dot.as_deref(), &output)?,
        Commands::Debug { command } => debug_cmd::run(&deployment, command.into(), &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeatable_selectors() {
        let cli = Cli::try_parse_from([
            "deploy", "apply", "--stack", "app", "--stack", "stack.db", "--omit", "dns",
            "--prune", "cdn",
        ])
        .unwrap();

        let request = cli.selection.request();
        let names: Vec<_> = request.targets.iter().map(|id| id.to_string()).collect();
        assert_eq!(names, vec!["app", "db"]);
        assert_eq!(request.omit.len(), 1);
        assert_eq!(request.prune.len(), 1);
        assert!(request.resolve_dependencies);
    }

    #[test]
    fn nodeps_requires_stack() {
        assert!(Cli::try_parse_from(["deploy", "apply", "--nodeps"]).is_err());

        let cli = Cli::try_parse_from(["deploy", "apply", "--nodeps", "--stack", "app"]).unwrap();
        assert!(!cli.selection.request().resolve_dependencies);
    }

    #[test]
    fn rejects_invalid_stack_ids() {
        assert!(Cli::try_parse_from(["deploy", "apply", "--stack", "a,b"]).is_err());
    }

    #[test]
    fn flags_before_subcommand() {
        let cli = Cli::try_parse_from([
            "deploy", "--workspace", "prod", "--unattended", "destroy", "--parallel", "3",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Destroy));
        assert_eq!(cli.selection.workspace.as_deref(), Some("prod"));
        assert!(cli.selection.unattended);
        assert_eq!(cli.selection.parallel, Some(3));
    }
}
