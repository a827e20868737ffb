//! Execution planning
//!
//! Turns a final stack selection into the ordered terramate invocations:
//!
//! 1. `terramate generate`
//! 2. `terraform init` in every selected stack (unless skipped)
//! 3. `terraform workspace select -or-create` (unless skipped)
//! 4. `terraform apply`, `plan` or `destroy` (destroy in reverse order)
//!
//! Every step after `generate` is scoped by the same tag selector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use super::id::StackId;

/// The terraform operation to run across the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCommand {
    Apply,
    Plan,
    Destroy,
}

impl RunCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunCommand::Apply => "apply",
            RunCommand::Plan => "plan",
            RunCommand::Destroy => "destroy",
        }
    }

    /// Destroy runs dependents before their prerequisites
    pub fn is_reversed(&self) -> bool {
        matches!(self, RunCommand::Destroy)
    }

    fn confirms(&self) -> bool {
        !matches!(self, RunCommand::Plan)
    }
}

impl fmt::Display for RunCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External program names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub terramate: String,
    pub terraform: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            terramate: "terramate".to_string(),
            terraform: "terraform".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOptions {
    /// Directory the commands run in
    pub working_dir: PathBuf,

    /// Terraform workspace to select (created if missing)
    pub workspace: String,

    /// Pass `-auto-approve` to apply/destroy
    pub unattended: bool,

    /// Parallelism hint forwarded to terramate
    pub parallel: Option<usize>,

    /// Run the init and workspace steps
    pub init: bool,

    pub var_files: Vec<PathBuf>,

    /// Remote state bucket passed to `terraform init`
    pub backend_bucket: Option<String>,

    pub tools: Tools,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            workspace: "default".to_string(),
            unattended: false,
            parallel: None,
            init: true,
            var_files: vec![],
            backend_bucket: None,
            tools: Tools::default(),
        }
    }
}

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Shell-style rendering, quoting arguments where needed
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=,:@%+".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Generate,
    Init,
    Workspace,
    Run(RunCommand),
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Generate => f.write_str("generate"),
            StepKind::Init => f.write_str("init"),
            StepKind::Workspace => f.write_str("workspace"),
            StepKind::Run(command) => command.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub kind: StepKind,
    pub invocation: Invocation,
}

/// Ordered invocations plus the directory they run in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub working_dir: PathBuf,
    pub steps: Vec<Step>,
}

impl ExecutionPlan {
    /// Returns the shell-style command lines in order
    pub fn commands(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|step| step.invocation.to_string())
            .collect()
    }
}

/// Builds the `--tags=` selector; None means all stacks
pub fn tag_selector(selected: &BTreeSet<StackId>) -> Option<String> {
    if selected.is_empty() {
        return None;
    }
    let tags: Vec<String> = selected.iter().map(StackId::tag).collect();
    Some(format!("--tags={}", tags.join(",")))
}

/// Plans the invocations for `command` over `selected`
pub fn plan(selected: &BTreeSet<StackId>, command: RunCommand, options: &PlanOptions) -> ExecutionPlan {
    let selector = tag_selector(selected);
    let tools = &options.tools;

    let run = |reverse: bool| {
        let mut invocation = Invocation::new(&tools.terramate).arg("run");
        if let Some(selector) = &selector {
            invocation = invocation.arg(selector.as_str());
        }
        invocation = invocation.arg("-X");
        if reverse {
            invocation = invocation.arg("--reverse");
        }
        if let Some(parallel) = options.parallel {
            invocation = invocation.arg(format!("--parallel={}", parallel));
        }
        invocation.arg("--").arg(&tools.terraform)
    };

    let mut steps = vec![Step {
        kind: StepKind::Generate,
        invocation: Invocation::new(&tools.terramate).arg("generate"),
    }];

    if options.init {
        let mut init = run(false).arg("init");
        if let Some(bucket) = &options.backend_bucket {
            init = init.arg(format!("-backend-config=bucket={}", bucket));
        }
        steps.push(Step {
            kind: StepKind::Init,
            invocation: init,
        });
        steps.push(Step {
            kind: StepKind::Workspace,
            invocation: run(false).args(["workspace", "select", "-or-create", options.workspace.as_str()]),
        });
    }

    let mut invocation = run(command.is_reversed())
        .arg(command.as_str())
        .args(
            options
                .var_files
                .iter()
                .map(|path| format!("-var-file={}", path.display())),
        );
    if options.unattended && command.confirms() {
        invocation = invocation.arg("-auto-approve");
    }
    steps.push(Step {
        kind: StepKind::Run(command),
        invocation,
    });

    ExecutionPlan {
        working_dir: options.working_dir.clone(),
        steps,
    }
}
