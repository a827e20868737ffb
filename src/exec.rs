//! Command execution
//!
//! Runs an [`ExecutionPlan`] step by step. The first failing step aborts the
//! plan; nothing is retried.

use std::path::Path;
use std::process::Command;

use thiserror::Error;

use crate::domain::{ExecutionPlan, Invocation, Step};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed ({}): {command}", exit_description(.code))]
    CommandFailed { command: String, code: Option<i32> },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Runs a single external command
pub trait Executor {
    fn execute(&mut self, invocation: &Invocation, working_dir: &Path) -> Result<(), ExecError>;
}

/// Spawns commands directly, inheriting stdio
#[derive(Debug, Default)]
pub struct ShellExecutor;

impl Executor for ShellExecutor {
    fn execute(&mut self, invocation: &Invocation, working_dir: &Path) -> Result<(), ExecError> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(working_dir)
            .status()
            .map_err(|source| ExecError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ExecError::CommandFailed {
                command: invocation.to_string(),
                code: status.code(),
            })
        }
    }
}

/// Records commands instead of running them (used for `--dry-run`)
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    pub commands: Vec<String>,
}

impl Executor for RecordingExecutor {
    fn execute(&mut self, invocation: &Invocation, _working_dir: &Path) -> Result<(), ExecError> {
        self.commands.push(invocation.to_string());
        Ok(())
    }
}

/// Executes every step in order, stopping at the first failure.
///
/// `on_step` is called before each step starts.
pub fn run_plan(
    plan: &ExecutionPlan,
    executor: &mut dyn Executor,
    mut on_step: impl FnMut(&Step),
) -> Result<(), ExecError> {
    for step in &plan.steps {
        on_step(step);
        executor.execute(&step.invocation, &plan.working_dir)?;
    }
    Ok(())
}
