//! `synq-sqlmesh` binary. Exits with status 1 when the command fails.

use std::process::ExitCode;
use synq_sqlmesh::{cli, instrumentation};

#[tokio::main]
async fn main() -> ExitCode {
    instrumentation::tracing::init_panic_handler();

    // Main entrypoint simply delegates control to CLI layer, which logs
    // whatever error ends the run.
    match cli::cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
