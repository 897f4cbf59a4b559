//! CLI entrypoint for submitting jobs to `offloadd`.
//!
//! The binary delegates to [`offload_cli::run`] with the process's standard
//! streams locked for the duration of the call.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    offload_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
