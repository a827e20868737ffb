//! CLI integration tests for deploy
//!
//! Each test builds a throwaway git-style repository with stack declarations
//! and drives the binary end to end. Commands run with `--dry-run` unless the
//! test installs a fake terramate.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the deploy binary
fn deploy_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("deploy"))
}

fn write_stack(root: &Path, dir: &str, content: &str) {
    let path = root.join("stacks").join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("stack.toml"), content).unwrap();
}

/// Repository with a <- b <- c and an independent d
fn setup_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();

    write_stack(dir.path(), "a", "[stack]\ntags = [\"stack.a\"]\n");
    write_stack(
        dir.path(),
        "b",
        "[stack]\ntags = [\"stack.b\"]\nafter = [\"tag:stack.a\"]\n",
    );
    write_stack(
        dir.path(),
        "c",
        "[stack]\ntags = [\"stack.c\"]\nafter = [\"tag:stack.b\", \"tag:stack.external\"]\n",
    );
    write_stack(dir.path(), "d", "[stack]\ntags = [\"stack.d\"]\n");
    dir
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Graph
// =============================================================================

#[test]
fn test_graph_lists_dependencies_and_edges() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["graph", "--stack", "c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All Dependencies"))
        .stdout(predicate::str::contains("__root__ -> a"))
        .stdout(predicate::str::contains("a -> b"))
        .stdout(predicate::str::contains("b -> c"))
        .stdout(predicate::str::contains("  d").not());
}

#[test]
fn test_graph_json_marks_excluded_nodes() {
    let dir = setup_repo();

    let output = deploy_cmd()
        .current_dir(dir.path())
        .args(["graph", "--format", "json", "--prune", "b", "--omit", "d"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["dependencies"], serde_json::json!(["a"]));
    let statuses: Vec<(String, String)> = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| {
            (
                n["id"].as_str().unwrap().to_string(),
                n["status"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("a".to_string(), "selected".to_string()),
            ("b".to_string(), "pruned".to_string()),
            ("c".to_string(), "pruned".to_string()),
            ("d".to_string(), "omitted".to_string()),
        ]
    );
    assert_eq!(json["edges"].as_array().unwrap().len(), 4);
}

#[test]
fn test_graph_writes_dot_file() {
    let dir = setup_repo();
    let dot = dir.path().join("infra-graph.dot");

    deploy_cmd()
        .current_dir(dir.path())
        .args(["graph", "--dot"])
        .arg(&dot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote graph to"));

    let content = fs::read_to_string(&dot).unwrap();
    assert!(content.starts_with("digraph stacks {"));
    assert!(content.contains("\"b\" -> \"c\";"));
}

#[test]
fn test_graph_warns_about_cycles() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    write_stack(
        dir.path(),
        "x",
        "[stack]\ntags = [\"stack.x\"]\nafter = [\"tag:stack.y\"]\n",
    );
    write_stack(
        dir.path(),
        "y",
        "[stack]\ntags = [\"stack.y\"]\nafter = [\"tag:stack.x\"]\n",
    );

    deploy_cmd()
        .current_dir(dir.path())
        .args(["graph"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Dependency cycle between x, y"))
        .stdout(predicate::str::contains("x -> y"))
        .stdout(predicate::str::contains("Run Order").not());
}

// =============================================================================
// Run commands (dry run)
// =============================================================================

#[test]
fn test_apply_dry_run_resolves_prerequisites() {
    let dir = setup_repo();

    let output = deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--stack", "c", "--workspace", "staging"])
        .output()
        .unwrap();
    assert!(output.status.success());

    assert_eq!(
        stdout_lines(&output),
        vec![
            "terramate generate",
            "terramate run --tags=stack.a,stack.b,stack.c -X -- terraform init",
            "terramate run --tags=stack.a,stack.b,stack.c -X -- terraform workspace select -or-create staging",
            "terramate run --tags=stack.a,stack.b,stack.c -X -- terraform apply",
        ]
    );
}

#[test]
fn test_omit_keeps_dependents() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["plan", "--dry-run", "--stack", "c", "--omit", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "terramate run --tags=stack.b,stack.c -X -- terraform plan",
        ));
}

#[test]
fn test_prune_removes_dependents() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--prune", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "terramate run --tags=stack.a,stack.d -X -- terraform apply",
        ));
}

#[test]
fn test_pruning_everything_is_a_noop() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--stack", "c", "--prune", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do"))
        .stdout(predicate::str::contains("terramate").not());
}

#[test]
fn test_destroy_unattended_without_init() {
    let dir = setup_repo();

    let output = deploy_cmd()
        .current_dir(dir.path())
        .args([
            "destroy", "--dry-run", "--stack", "b", "--unattended", "--noinit", "--parallel", "2",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    assert_eq!(
        stdout_lines(&output),
        vec![
            "terramate generate",
            "terramate run --tags=stack.a,stack.b -X --reverse --parallel=2 -- terraform destroy -auto-approve",
        ]
    );
}

#[test]
fn test_nodeps_runs_only_named_stacks() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--nodeps", "--stack", "c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tags=stack.c -X -- terraform apply"));
}

#[test]
fn test_nodeps_warns_about_unknown_stack() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--nodeps", "--stack", "typo"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Unknown stack(s) requested: typo"));
}

#[test]
fn test_nodeps_without_stack_is_rejected() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--nodeps"])
        .assert()
        .failure();
}

#[test]
fn test_dry_run_json() {
    let dir = setup_repo();

    let output = deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--format", "json", "--stack", "b", "--backend-bucket", "state"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["command"], "apply");
    assert_eq!(json["stacks"], serde_json::json!(["a", "b"]));
    let commands = json["commands"].as_array().unwrap();
    assert_eq!(commands.len(), 4);
    assert!(commands[1]
        .as_str()
        .unwrap()
        .ends_with("terraform init -backend-config=bucket=state"));
}

#[test]
fn test_var_files_are_absolute() {
    let dir = setup_repo();

    let output = deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--noinit", "--var-file", "prod.tfvars"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let last = stdout_lines(&output).pop().unwrap();
    let expected = format!("-var-file={}", dir.path().join("prod.tfvars").display());
    assert!(last.contains(&expected), "{}", last);
}

#[test]
fn test_unknown_stack_warns() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--stack", "ghost"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Unknown stack(s) requested: ghost"));
}

// =============================================================================
// Configuration and errors
// =============================================================================

#[test]
fn test_before_rejected_by_default() {
    let dir = setup_repo();
    write_stack(
        dir.path(),
        "seed",
        "[stack]\ntags = [\"stack.seed\"]\nbefore = [\"tag:stack.a\"]\n",
    );

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reverse dependencies are disabled"));
}

#[test]
fn test_before_enabled_in_config() {
    let dir = setup_repo();
    write_stack(
        dir.path(),
        "seed",
        "[stack]\ntags = [\"stack.seed\"]\nbefore = [\"tag:stack.a\"]\n",
    );
    fs::write(dir.path().join("deploy.toml"), "reverse_dependencies = true\n").unwrap();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["graph", "--stack", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seed -> a"));
}

#[test]
fn test_missing_stack_tag_fails() {
    let dir = setup_repo();
    write_stack(dir.path(), "orphan", "[stack]\ntags = [\"team.ops\"]\n");

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no 'stack.' tag"));
}

#[test]
fn test_invalid_stack_tag_fails() {
    let dir = setup_repo();
    write_stack(dir.path(), "spaced", "[stack]\ntags = [\"stack.my app\"]\n");

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid stack tag"))
        .stderr(predicate::str::contains("'my app'"));
}

#[test]
fn test_terramate_stack_files_are_read() {
    let dir = setup_repo();
    let path = dir.path().join("stacks/e");
    fs::create_dir_all(&path).unwrap();
    fs::write(
        path.join("stack.tm.hcl"),
        "stack {\n  name  = \"e\"\n  tags  = [\"stack.e\"]\n  after = [\"tag:stack.a\"]\n}\n",
    )
    .unwrap();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--stack", "e"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tags=stack.a,stack.e -X"));
}

#[cfg(unix)]
#[test]
fn test_directory_symlink_loop_is_not_followed() {
    let dir = setup_repo();
    std::os::unix::fs::symlink(dir.path().join("stacks"), dir.path().join("stacks/a/shared"))
        .unwrap();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["graph"])
        .assert()
        .success()
        .stderr(predicate::str::contains("declared more than once").not());
}

#[test]
fn test_outside_repository_fails() {
    let dir = TempDir::new().unwrap();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["graph"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".git could not be found"));
}

#[test]
fn test_env_option_selects_directory() {
    let dir = setup_repo();
    let prod = dir.path().join("envs").join("prod").join("api");
    fs::create_dir_all(&prod).unwrap();
    fs::write(prod.join("stack.yaml"), "stack:\n  tags: [stack.api]\n").unwrap();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--dry-run", "--env", "envs/prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tags=stack.api -X"));
}

#[test]
fn test_debug_shows_every_stage() {
    let dir = setup_repo();

    deploy_cmd()
        .current_dir(dir.path())
        .args(["debug", "--stack", "c", "--omit", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stacks (4):"))
        .stdout(predicate::str::contains("Resolution:"))
        .stdout(predicate::str::contains("omitted:  a"))
        .stdout(predicate::str::contains("terraform apply"));
}

// =============================================================================
// Execution (fake terramate)
// =============================================================================

#[cfg(unix)]
fn install_fake_terramate(root: &Path, fail_on: &str) {
    use std::os::unix::fs::PermissionsExt;

    let script = root.join("fake-terramate.sh");
    let body = format!(
        "#!/bin/sh\necho \"$*\" >> \"{log}\"\ncase \"$*\" in\n  *\"{fail}\"*) exit 7 ;;\nesac\nexit 0\n",
        log = root.join("calls.log").display(),
        fail = fail_on,
    );
    fs::write(&script, body).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    fs::write(
        root.join("deploy.toml"),
        format!("[tools]\nterramate = \"{}\"\n", script.display()),
    )
    .unwrap();
}

#[cfg(unix)]
#[test]
fn test_apply_runs_every_step() {
    let dir = setup_repo();
    install_fake_terramate(dir.path(), "never-matches");

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply", "--stack", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apply finished for a, b"));

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    let calls: Vec<_> = calls.lines().collect();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], "generate");
    assert!(calls[3].ends_with("-- terraform apply"));
}

#[cfg(unix)]
#[test]
fn test_failed_step_aborts_remaining_steps() {
    let dir = setup_repo();
    install_fake_terramate(dir.path(), "terraform init");

    deploy_cmd()
        .current_dir(dir.path())
        .args(["apply"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("apply aborted"))
        .stderr(predicate::str::contains("exit code 7"));

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(calls.lines().count(), 2);
}
