//! Integration tests for the `offload` binary entry point.
//!
//! Verifies help output and the exit status for usage and transport
//! failures.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn help_lists_the_positional_arguments() {
    let mut command = cargo_bin_cmd!("offload");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("<HANDLER>"))
        .stdout(contains("<INPUT>"));
}

#[test]
fn missing_arguments_exit_with_usage_failure() {
    let mut command = cargo_bin_cmd!("offload");
    command.assert().code(2).stderr(contains("Usage"));
}

#[test]
fn unreachable_daemon_exits_with_transport_failure() {
    let mut command = cargo_bin_cmd!("offload");
    command
        .args(["--daemon-socket", "tcp://127.0.0.1:1", "echo", "-"])
        .write_stdin("payload");
    command
        .assert()
        .code(2)
        .stderr(contains("failed to connect"));
}

#[cfg(unix)]
#[test]
fn bare_invocation_uses_the_default_endpoint() {
    let runtime = tempfile::tempdir().expect("runtime dir");
    let mut command = cargo_bin_cmd!("offload");
    command
        .env("XDG_RUNTIME_DIR", runtime.path())
        .env_remove("OFFLOAD_DAEMON_SOCKET")
        .env_remove("OFFLOAD_CONFIG_PATH")
        .args(["echo", "-"])
        .write_stdin("payload");
    command
        .assert()
        .code(2)
        .stderr(contains("failed to connect"))
        .stderr(contains("offloadd.sock"));
}
