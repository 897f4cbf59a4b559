//! Command-line client for the offload daemon.
//!
//! `offload` reads one payload from a file or standard input, submits it to a
//! named handler over the configured daemon socket and writes the handler's
//! output to standard output or a file. The elapsed time reported by the
//! daemon goes to standard error.
//!
//! Exit status is `0` on success, `1` when the daemon rejects the job and `2`
//! for usage, configuration, IO and transport failures.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use offload_protocol::{ClientError, OffloadClient, Submission};
use ortho_config::OrthoError;
use thiserror::Error;

mod cli;
mod config;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};

/// Exit status reported when the daemon answers with a failure response.
const EXIT_REJECTED: u8 = 1;
/// Exit status for every failure that is not a rejection.
const EXIT_FAILURE: u8 = 2;

/// Errors surfaced by the client runtime.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<OrthoError>),
    /// The payload could not be read.
    #[error("failed to read input '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The handler output could not be written.
    #[error("failed to write output '{path}': {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Connecting, exchanging or the job itself failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl AppError {
    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Client(ClientError::Rejected { .. }) => ExitCode::from(EXIT_REJECTED),
            _ => ExitCode::from(EXIT_FAILURE),
        }
    }
}

/// Bundles the IO streams provided to the client runtime.
pub(crate) struct IoStreams<'a, R: Read, W: Write, E: Write> {
    pub(crate) stdin: &'a mut R,
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

/// Runs the client using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    let mut io = IoStreams {
        stdin,
        stdout,
        stderr,
    };
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the client with a custom configuration loader.
pub(crate) fn run_with_loader<I, R, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, R, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        // `--help` and `--version` arrive as errors that belong on stdout.
        Err(error) if !error.use_stderr() => {
            let _ = write!(io.stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = write!(io.stderr, "{error}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let result = loader
        .load(&split.config_arguments)
        .and_then(|config| execute(&cli, config.daemon_socket(), io));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io.stderr, "{error}");
            error.exit_code()
        }
    }
}

fn execute<R, W, E>(
    cli: &Cli,
    endpoint: &offload_config::SocketEndpoint,
    io: &mut IoStreams<'_, R, W, E>,
) -> Result<(), AppError>
where
    R: Read,
    W: Write,
    E: Write,
{
    let payload = read_input(cli, &mut *io.stdin)?;
    let mut client = OffloadClient::connect(endpoint)?;
    let Submission { output, elapsed } = client.submit(&cli.handler, &payload)?;
    write_output(cli.output.as_deref(), &output, &mut *io.stdout)?;
    let _ = writeln!(io.stderr, "elapsed: {elapsed:.6}s");
    Ok(())
}

fn read_input<R: Read>(cli: &Cli, stdin: &mut R) -> Result<Vec<u8>, AppError> {
    let read_error = |source| AppError::ReadInput {
        path: cli.input.clone(),
        source,
    };
    if cli.reads_stdin() {
        let mut payload = Vec::new();
        stdin.read_to_end(&mut payload).map_err(read_error)?;
        Ok(payload)
    } else {
        fs::read(&cli.input).map_err(read_error)
    }
}

fn write_output<W: Write>(
    destination: Option<&Path>,
    output: &[u8],
    stdout: &mut W,
) -> Result<(), AppError> {
    match destination {
        Some(path) => fs::write(path, output).map_err(|source| AppError::WriteOutput {
            path: path.to_path_buf(),
            source,
        }),
        None => stdout
            .write_all(output)
            .and_then(|()| stdout.flush())
            .map_err(|source| AppError::WriteOutput {
                path: PathBuf::from("<stdout>"),
                source,
            }),
    }
}
