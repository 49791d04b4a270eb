use super::tree::{CommandNode, FlagSpec};
use crate::config::keys;
use clap::Command;
use std::sync::OnceLock;

pub const BIN_NAME: &str = "stackit";

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.1.0" for releases, "0.1.0@abc1234 2024-01-15 14:30" for dev builds
pub fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

/// Flags accepted by every command.
pub fn global_flags() -> Vec<FlagSpec> {
    vec![
        FlagSpec::value(keys::PROJECT_ID, "Project ID"),
        FlagSpec::value(keys::REGION, "Target region for region-specific requests"),
        FlagSpec::value(
            keys::OUTPUT_FORMAT,
            "Output format, one of [\"pretty\" \"json\" \"yaml\" \"none\"]",
        )
        .short('o'),
        FlagSpec::value(
            keys::VERBOSITY,
            "Verbosity of the CLI, one of [\"silent\" \"default\" \"info\" \"debug\"]",
        ),
        FlagSpec::bool(keys::ASYNC, "If set, runs the command asynchronously"),
        FlagSpec::bool(keys::ASSUME_YES, "If set, skips all confirmation prompts").short('y'),
    ]
}

/// The clap command for the whole tree, with global flags and `--version`.
pub fn root_command(root: &CommandNode) -> Command {
    let mut cmd = root
        .to_clap()
        .name(BIN_NAME)
        .bin_name(BIN_NAME)
        .version(version())
        .disable_help_subcommand(true);
    for flag in global_flags() {
        cmd = cmd.arg(flag.to_arg().global(true).help_heading("Global Flags"));
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_starts_with_package_version() {
        assert!(version().starts_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_global_flags_are_config_keys() {
        for flag in global_flags() {
            let key = keys::lookup(flag.name).expect("registered key");
            assert!(key.global, "{}", flag.name);
        }
    }

    #[test]
    fn test_root_command_is_consistent() {
        root_command(&crate::commands::root()).debug_assert();
    }
}
