//! # Command-Line Interface
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `apply` | `terraform apply` over the selection, in dependency order |
//! | `plan` | `terraform plan` over the selection |
//! | `destroy` | `terraform destroy` over the selection, in reverse order |
//! | `graph` | Print resolved dependencies and edges, optionally as DOT |
//! | `debug` | Print registry, resolution, selection and plan |
//!
//! ## Selection
//!
//! - `--stack X` (repeatable) selects X and its prerequisites
//! - `--prune X` removes X and everything that depends on it
//! - `--omit X` removes only X from the run
//! - `--nodeps` skips dependency resolution (requires `--stack`)
//!
//! ## Output Formats
//!
//! All commands support `--format text|json`; `--verbose` prints debug
//! lines to stderr.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod deployment;
mod run_cmd;
mod graph_cmd;
mod debug_cmd;

pub use app::{run, Cli, Commands, PlannedCommand, SelectionArgs};
pub use deployment::Deployment;
pub use output::{Output, OutputFormat};
