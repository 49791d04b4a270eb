//! Snapshot of the process environment.
//!
//! Taken once at startup and passed around by reference, so resolution code
//! never reads `std::env` directly and tests can supply their own variables.

use crate::config::keys;
use std::collections::BTreeMap;
use std::ffi::OsString;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    skipped: Vec<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Pairs that are not valid UTF-8 are left out and remembered by their
    /// lossy name.
    pub fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut env = Self::default();
        for (name, value) in pairs {
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    env.vars.insert(name, value);
                }
                (Ok(name), Err(_)) => env.skipped.push(name),
                (Err(name), _) => env.skipped.push(name.to_string_lossy().into_owned()),
            }
        }
        env
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            skipped: Vec::new(),
        }
    }

    /// Value of a variable; empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Overlay value for a config key (`project-id` → `STACKIT_PROJECT_ID`).
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.get(&keys::env_name(key))
    }

    /// `STACKIT_*` variables that are not registered.
    pub fn unknown_vars(&self) -> Vec<&str> {
        self.vars
            .keys()
            .filter(|k| k.starts_with(keys::ENV_PREFIX) && !keys::is_known_env(k))
            .map(String::as_str)
            .collect()
    }

    /// Variables dropped because their name or value is not UTF-8.
    pub fn skipped_vars(&self) -> &[String] {
        &self.skipped
    }
}
