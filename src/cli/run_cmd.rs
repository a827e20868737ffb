//! apply / plan / destroy

use anyhow::{Context, Result};

use super::output::{join_ids, Output};
use super::Deployment;
use crate::domain::{ExecutionPlan, RunCommand};
use crate::exec::{run_plan, Executor, RecordingExecutor, ShellExecutor};

pub fn run(deployment: &Deployment, command: RunCommand, dry_run: bool, output: &Output) -> Result<()> {
    let ctx = command.as_str();

    if deployment.is_noop() {
        output.verbose_ctx(ctx, "Every resolved stack was pruned or omitted");
        output.success("Nothing to do: all selected stacks were excluded");
        return Ok(());
    }

    let plan = deployment.plan(command);
    let selected = &deployment.selection.selected;
    output.verbose_ctx(
        ctx,
        &format!(
            "Running in {} for: {}",
            plan.working_dir.display(),
            join_ids(selected, "all stacks")
        ),
    );

    if dry_run {
        let mut executor = RecordingExecutor::default();
        run_plan(&plan, &mut executor, |_| {})?;

        if output.is_json() {
            output.data(&serde_json::json!({
                "command": command,
                "working_dir": plan.working_dir,
                "stacks": selected,
                "commands": executor.commands,
            }));
        } else {
            for line in &executor.commands {
                println!("{}", line);
            }
        }
        return Ok(());
    }

    let mut executor = ShellExecutor;
    execute(&plan, &mut executor, output).with_context(|| format!("{} aborted", command))?;

    output.success(&format!(
        "{} finished for {}",
        command,
        join_ids(selected, "all stacks")
    ));
    Ok(())
}

fn execute(plan: &ExecutionPlan, executor: &mut dyn Executor, output: &Output) -> Result<()> {
    run_plan(plan, executor, |step| {
        output.verbose_ctx("exec", &format!("Step: {}", step.kind));
        output.step(&step.invocation.to_string());
    })?;
    Ok(())
}
