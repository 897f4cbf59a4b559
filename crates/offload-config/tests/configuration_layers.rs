//! Layering behaviour of the shared configuration loader.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use offload_config::{Config, LogFormat, SocketEndpoint, default_socket_endpoint};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let previous = std::env::var_os(key);
        // Environment mutation is unsafe in edition 2024; callers hold
        // ENV_MUTEX so tests in this binary never race on it.
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[fixture]
fn config_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn argv(args: &[&OsStr]) -> Vec<OsString> {
    let mut argv = vec![OsString::from("offloadd")];
    argv.extend(args.iter().map(|arg| arg.to_os_string()));
    argv
}

fn load(args: &[&OsStr]) -> Config {
    let _lock = env_lock();
    Config::load_from_iter(argv(args)).expect("configuration loads")
}

#[rstest]
fn defaults_apply_without_sources() {
    let config = load(&[]);
    assert_eq!(config.daemon_socket(), &default_socket_endpoint());
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.log_format(), LogFormat::Json);
    assert!(config.handlers().is_empty());
    assert!(config.perf_log().is_none());
    assert!(config.data_log().is_none());
}

#[rstest]
fn file_values_populate_handlers_and_logs(config_dir: TempDir) {
    let path = config_dir.path().join("offload.toml");
    fs::write(
        &path,
        concat!(
            "handlers = [\"echo\", \"sha256\"]\n",
            "perf_log = \"/var/log/offload/perf.jsonl\"\n",
            "daemon_socket = { transport = \"tcp\", host = \"127.0.0.1\", port = 9100 }\n",
        ),
    )
    .expect("write config file");

    let config = load(&[OsStr::new("--config-path"), path.as_os_str()]);
    assert_eq!(config.handlers(), ["echo".to_owned(), "sha256".to_owned()]);
    assert_eq!(
        config.perf_log().map(|p| p.as_str()),
        Some("/var/log/offload/perf.jsonl")
    );
    assert_eq!(
        config.daemon_socket(),
        &SocketEndpoint::tcp("127.0.0.1", 9100)
    );
}

#[rstest]
fn cli_flag_overrides_file(config_dir: TempDir) {
    let path = config_dir.path().join("offload.toml");
    fs::write(
        &path,
        "daemon_socket = { transport = \"tcp\", host = \"127.0.0.1\", port = 9100 }\n",
    )
    .expect("write config file");

    let config = load(&[
        OsStr::new("--config-path"),
        path.as_os_str(),
        OsStr::new("--daemon-socket"),
        OsStr::new("tcp://127.0.0.1:9200"),
    ]);
    assert_eq!(
        config.daemon_socket(),
        &SocketEndpoint::tcp("127.0.0.1", 9200)
    );
}

#[test]
fn environment_overrides_defaults() {
    let _lock = env_lock();
    let _env = EnvOverride::set_var("OFFLOAD_LOG_FILTER", OsStr::new("offloadd=debug"));
    let config = Config::load_from_iter(argv(&[])).expect("configuration loads");
    assert_eq!(config.log_filter(), "offloadd=debug");
}

#[rstest]
fn malformed_file_is_reported(config_dir: TempDir) {
    let path = config_dir.path().join("offload.toml");
    fs::write(&path, "handlers = [\"echo\"\n").expect("write malformed config");

    let _lock = env_lock();
    let result = Config::load_from_iter(argv(&[OsStr::new("--config-path"), path.as_os_str()]));
    assert!(result.is_err(), "unterminated array must fail to load");
}
