//! Configuration loading helpers for the `offload` client.
//!
//! Leading configuration flags are split off and handed to `ortho_config`;
//! everything from the first other token onwards belongs to the clap parser.

use std::ffi::{OsStr, OsString};

use offload_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the flags `offload-config` exposes that matter to a
/// client.
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--daemon-socket"];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Loader backed by the layered `ortho_config` sources.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// Arguments partitioned between the configuration loader and clap.
///
/// Both halves keep the program name in first position.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

/// Returns whether `argument` is a configuration flag still awaiting its
/// value, or `None` when it is not a configuration flag at all.
fn config_flag(argument: &OsStr) -> Option<bool> {
    let text = argument.to_str()?;
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text, false),
    };
    CONFIG_CLI_FLAGS
        .contains(&flag)
        .then_some(!has_inline_value)
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut index = 0usize;
    while let Some(argument) = rest.get(index) {
        let Some(needs_value) = config_flag(argument) else {
            break;
        };
        config_arguments.push(argument.clone());
        index += 1;
        if needs_value && let Some(value) = rest.get(index) {
            config_arguments.push(value.clone());
            index += 1;
        }
    }

    let mut command_arguments = vec![program.clone()];
    command_arguments.extend(rest.iter().skip(index).cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::separate_value(
        &["offload", "--daemon-socket", "tcp://127.0.0.1:9000", "echo", "-"],
        &["offload", "--daemon-socket", "tcp://127.0.0.1:9000"],
        &["offload", "echo", "-"]
    )]
    #[case::inline_value(
        &["offload", "--config-path=offload.toml", "sha256", "in.bin"],
        &["offload", "--config-path=offload.toml"],
        &["offload", "sha256", "in.bin"]
    )]
    #[case::no_config_flags(
        &["offload", "reverse", "in.bin", "--output", "out.bin"],
        &["offload"],
        &["offload", "reverse", "in.bin", "--output", "out.bin"]
    )]
    #[case::flags_after_handler_stay_with_the_command(
        &["offload", "echo", "--daemon-socket", "tcp://127.0.0.1:1"],
        &["offload"],
        &["offload", "echo", "--daemon-socket", "tcp://127.0.0.1:1"]
    )]
    fn splits_leading_configuration_flags(
        #[case] args: &[&str],
        #[case] config: &[&str],
        #[case] command: &[&str],
    ) {
        let split = split_config_arguments(&argv(args));
        assert_eq!(split.config_arguments, argv(config));
        assert_eq!(split.command_arguments, argv(command));
    }

    #[test]
    fn empty_arguments_split_into_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.command_arguments.is_empty());
    }
}
