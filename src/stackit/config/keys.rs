//! Registry of configuration keys and the environment variables that overlay
//! them.
//!
//! Every key can be stored in a profile and overridden by `STACKIT_<KEY>`,
//! with the key uppercased and `-` replaced by `_`. A handful of process-level
//! variables that are not config keys are registered here as well, so any
//! other `STACKIT_*` variable can be reported as unknown.

use once_cell::sync::Lazy;
use std::collections::BTreeSet;

pub const ENV_PREFIX: &str = "STACKIT_";

pub const PROJECT_ID: &str = "project-id";
pub const REGION: &str = "region";
pub const OUTPUT_FORMAT: &str = "output-format";
pub const VERBOSITY: &str = "verbosity";
pub const ASYNC: &str = "async";
pub const ASSUME_YES: &str = "assume-yes";
pub const SESSION_TIME_LIMIT: &str = "session-time-limit";
pub const IDP_CUSTOM_ENDPOINT: &str = "identity-provider-custom-endpoint";
pub const IDP_CUSTOM_CLIENT_ID: &str = "identity-provider-custom-client-id";
pub const TOKEN_CUSTOM_ENDPOINT: &str = "token-custom-endpoint";
pub const OBSERVABILITY_CUSTOM_ENDPOINT: &str = "observability-custom-endpoint";
pub const RESOURCE_MANAGER_CUSTOM_ENDPOINT: &str = "resource-manager-custom-endpoint";

pub const ACCESS_TOKEN_ENV: &str = "STACKIT_ACCESS_TOKEN";
pub const PROFILE_ENV: &str = "STACKIT_CLI_PROFILE";
pub const CONFIG_DIR_ENV: &str = "STACKIT_CONFIG_DIR";
pub const WAIT_INTERVAL_ENV: &str = "STACKIT_WAIT_INTERVAL_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Bool,
}

#[derive(Debug)]
pub struct ConfigKey {
    pub name: &'static str,
    pub kind: ValueKind,
    pub help: &'static str,
    /// Global keys are also flags on every command.
    pub global: bool,
}

pub static KEYS: &[ConfigKey] = &[
    ConfigKey {
        name: PROJECT_ID,
        kind: ValueKind::String,
        help: "Project ID",
        global: true,
    },
    ConfigKey {
        name: REGION,
        kind: ValueKind::String,
        help: "Target region for region-specific requests",
        global: true,
    },
    ConfigKey {
        name: OUTPUT_FORMAT,
        kind: ValueKind::String,
        help: "Output format, one of [\"pretty\" \"json\" \"yaml\" \"none\"]",
        global: true,
    },
    ConfigKey {
        name: VERBOSITY,
        kind: ValueKind::String,
        help: "Verbosity of the CLI, one of [\"silent\" \"default\" \"info\" \"debug\"]",
        global: true,
    },
    ConfigKey {
        name: ASYNC,
        kind: ValueKind::Bool,
        help: "If set, runs the command asynchronously",
        global: true,
    },
    ConfigKey {
        name: ASSUME_YES,
        kind: ValueKind::Bool,
        help: "If set, skips all confirmation prompts",
        global: true,
    },
    ConfigKey {
        name: SESSION_TIME_LIMIT,
        kind: ValueKind::String,
        help: "Maximum time before authentication is required again, e.g. \"2h\"",
        global: false,
    },
    ConfigKey {
        name: IDP_CUSTOM_ENDPOINT,
        kind: ValueKind::String,
        help: "Identity Provider base URL, used for user authentication",
        global: false,
    },
    ConfigKey {
        name: IDP_CUSTOM_CLIENT_ID,
        kind: ValueKind::String,
        help: "Identity Provider client ID, used for user authentication",
        global: false,
    },
    ConfigKey {
        name: TOKEN_CUSTOM_ENDPOINT,
        kind: ValueKind::String,
        help: "Custom token endpoint of the Service Account API",
        global: false,
    },
    ConfigKey {
        name: OBSERVABILITY_CUSTOM_ENDPOINT,
        kind: ValueKind::String,
        help: "Observability API base URL",
        global: false,
    },
    ConfigKey {
        name: RESOURCE_MANAGER_CUSTOM_ENDPOINT,
        kind: ValueKind::String,
        help: "Resource Manager API base URL",
        global: false,
    },
];

static KNOWN_ENV: Lazy<BTreeSet<String>> = Lazy::new(|| {
    let mut names: BTreeSet<String> = KEYS.iter().map(|k| env_name(k.name)).collect();
    for extra in [
        ACCESS_TOKEN_ENV,
        PROFILE_ENV,
        CONFIG_DIR_ENV,
        WAIT_INTERVAL_ENV,
    ] {
        names.insert(extra.to_string());
    }
    names
});

pub fn lookup(name: &str) -> Option<&'static ConfigKey> {
    KEYS.iter().find(|k| k.name == name)
}

pub fn env_name(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.to_ascii_uppercase().replace('-', "_"))
}

pub fn is_known_env(name: &str) -> bool {
    KNOWN_ENV.contains(name)
}
