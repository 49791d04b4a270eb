//! Resolution of the global flags.
//!
//! Each global is taken from the first layer that has it:
//!
//! 1. the flag, when given on the command line
//! 2. `STACKIT_<KEY>` in the environment
//! 3. the active profile
//! 4. the `default` profile
//! 5. the built-in default
//!
//! The winning value is validated whichever layer it came from; an invalid
//! value fails the invocation with an input error naming the flag and the
//! layer.

use crate::config::{keys, Config, ValueSource};
use crate::env::Environment;
use crate::error::{InputError, Result};
use crate::flags::{parse_bool, validate_uuid};
use crate::output::OutputFormat;
use crate::print::Verbosity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

pub const DEFAULT_REGION: &str = "eu01";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalFlags {
    pub project_id: Option<String>,
    pub region: String,
    pub output_format: OutputFormat,
    pub verbosity: Verbosity,
    #[serde(rename = "async")]
    pub async_mode: bool,
    pub assume_yes: bool,
}

impl Default for GlobalFlags {
    fn default() -> Self {
        Self {
            project_id: None,
            region: DEFAULT_REGION.to_string(),
            output_format: OutputFormat::Pretty,
            verbosity: Verbosity::Default,
            async_mode: false,
            assume_yes: false,
        }
    }
}

impl GlobalFlags {
    /// The project id, required by project-scoped leaves.
    pub fn project_id(&self) -> Result<&str> {
        self.project_id
            .as_deref()
            .ok_or_else(|| InputError::MissingProjectId.into())
    }
}

/// Values given on the command line, keyed by flag name.
pub type CliValues = BTreeMap<String, String>;

struct Layers<'a> {
    cli: &'a CliValues,
    env: &'a Environment,
    config: &'a Config,
}

impl Layers<'_> {
    fn lookup(&self, key: &str) -> Option<(String, String)> {
        if let Some(v) = self.cli.get(key) {
            return Some((v.clone(), "command line".to_string()));
        }
        if let Some(v) = self.env.config_value(key) {
            return Some((v.to_string(), format!("environment variable {}", keys::env_name(key))));
        }
        self.config.get(key).map(|(value, source)| {
            let from = match source {
                ValueSource::ActiveProfile => {
                    format!("profile {:?}", self.config.active_profile())
                }
                ValueSource::DefaultProfile => "default profile".to_string(),
            };
            (value.as_string(), from)
        })
    }

    fn parsed<T>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Result<Option<T>> {
        match self.lookup(key) {
            Some((raw, from)) => parse(&raw)
                .map(Some)
                .map_err(|details| InputError::flag(key, format!("{details} (set via {from})")).into()),
            None => Ok(None),
        }
    }
}

pub fn resolve(cli: &CliValues, env: &Environment, config: &Config) -> Result<GlobalFlags> {
    let layers = Layers { cli, env, config };
    let defaults = GlobalFlags::default();

    let project_id = layers.parsed(keys::PROJECT_ID, |v| {
        validate_uuid(v).map(|_| v.to_string())
    })?;
    let region = layers
        .parsed(keys::REGION, |v| {
            let v = v.trim();
            if v.is_empty() {
                Err("must not be empty".to_string())
            } else {
                Ok(v.to_string())
            }
        })?
        .unwrap_or(defaults.region);
    let output_format = layers
        .parsed(keys::OUTPUT_FORMAT, OutputFormat::from_str)?
        .unwrap_or(defaults.output_format);
    let verbosity = layers
        .parsed(keys::VERBOSITY, Verbosity::from_str)?
        .unwrap_or(defaults.verbosity);
    let async_mode = layers
        .parsed(keys::ASYNC, parse_bool)?
        .unwrap_or(defaults.async_mode);
    let assume_yes = layers
        .parsed(keys::ASSUME_YES, parse_bool)?
        .unwrap_or(defaults.assume_yes);

    Ok(GlobalFlags {
        project_id,
        region,
        output_format,
        verbosity,
        async_mode,
        assume_yes,
    })
}
