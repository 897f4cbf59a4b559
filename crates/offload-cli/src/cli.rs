//! Argument definitions for the `offload` client.

use std::path::PathBuf;

use clap::Parser;

/// Token selecting standard input as the payload source.
pub(crate) const STDIN_TOKEN: &str = "-";

/// Submits one payload to a compute handler hosted by `offloadd`.
///
/// Configuration flags (`--config-path`, `--daemon-socket`) are consumed by
/// the configuration loader and must precede the handler name.
#[derive(Parser, Debug)]
#[command(
    name = "offload",
    version,
    override_usage = "offload [--config-path FILE] [--daemon-socket URL] <HANDLER> <INPUT> [--output FILE]"
)]
pub(crate) struct Cli {
    /// Name of the handler that processes the payload (for example `sha256`).
    #[arg(value_name = "HANDLER")]
    pub(crate) handler: String,
    /// File holding the payload, or `-` to read standard input.
    #[arg(value_name = "INPUT")]
    pub(crate) input: PathBuf,
    /// Writes the handler output to this file instead of standard output.
    #[arg(long, short, value_name = "FILE")]
    pub(crate) output: Option<PathBuf>,
}

impl Cli {
    /// Returns `true` when the payload comes from standard input.
    pub(crate) fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == STDIN_TOKEN
    }
}
