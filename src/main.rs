//! deploy - dependency-ordered terramate runs

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = stack_deploy::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
