//! # Configuration
//!
//! Configuration is a set of named profiles, each a flat map from key to
//! scalar value. The `default` profile always exists and doubles as the
//! defaults layer: a key missing from the active profile is looked up there
//! before falling back to the built-in default.
//!
//! ```text
//! <config dir>/
//! ├── profiles.json        {"active": "dev", "profiles": {"default": {..}, "dev": {..}}}
//! └── credentials/
//!     └── <profile>.json   (see auth::storage)
//! ```
//!
//! Storage follows the split used throughout the crate: [`ConfigStore`] only
//! knows how to load and save the [`Profiles`] document (filesystem or memory),
//! while [`Config`] owns the rules (active profile selection, lookups,
//! profile lifecycle).
//!
//! The active profile can be overridden per process with `STACKIT_CLI_PROFILE`.
//! Concurrent writers are not coordinated; the last `save` wins.

pub mod fs;
pub mod keys;
pub mod memory;

use crate::error::{CliError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_PROFILE: &str = "default";

/// A stored scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl ConfigValue {
    pub fn as_string(&self) -> String {
        match self {
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profiles {
    #[serde(default = "default_profile_name")]
    pub active: String,
    #[serde(default)]
    pub profiles: BTreeMap<String, BTreeMap<String, ConfigValue>>,
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE.to_string()
}

impl Default for Profiles {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), BTreeMap::new());
        Self {
            active: DEFAULT_PROFILE.to_string(),
            profiles,
        }
    }
}

/// Raw load/save of the profiles document.
pub trait ConfigStore {
    /// Returns the stored document, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Profiles>>;

    fn save(&self, profiles: &Profiles) -> Result<()>;

    /// Human-readable location, used in messages.
    fn location(&self) -> String;
}

/// Where the source of a looked-up value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    ActiveProfile,
    DefaultProfile,
}

pub struct Config {
    doc: Profiles,
    active: String,
    store: Box<dyn ConfigStore>,
}

impl Config {
    /// Loads the document and selects the active profile.
    ///
    /// `profile_override` (from `STACKIT_CLI_PROFILE`) must name an existing
    /// profile. A stored active pointer that names a missing profile falls
    /// back to `default`.
    pub fn load(store: Box<dyn ConfigStore>, profile_override: Option<&str>) -> Result<Self> {
        let mut doc = store.load()?.unwrap_or_default();
        doc.profiles.entry(DEFAULT_PROFILE.to_string()).or_default();

        let active = match profile_override.filter(|p| !p.is_empty()) {
            Some(name) => {
                if !doc.profiles.contains_key(name) {
                    return Err(CliError::Config(format!(
                        "profile {name:?} set in {} does not exist",
                        keys::PROFILE_ENV
                    )));
                }
                name.to_string()
            }
            None if doc.profiles.contains_key(&doc.active) => doc.active.clone(),
            None => DEFAULT_PROFILE.to_string(),
        };
        doc.active = if doc.profiles.contains_key(&doc.active) {
            doc.active.clone()
        } else {
            DEFAULT_PROFILE.to_string()
        };

        Ok(Self { doc, active, store })
    }

    pub fn active_profile(&self) -> &str {
        &self.active
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Value of `key` in the active profile, falling back to `default`.
    pub fn get(&self, key: &str) -> Option<(&ConfigValue, ValueSource)> {
        if let Some(v) = self.doc.profiles.get(&self.active).and_then(|p| p.get(key)) {
            return Some((v, ValueSource::ActiveProfile));
        }
        self.doc
            .profiles
            .get(DEFAULT_PROFILE)
            .and_then(|p| p.get(key))
            .map(|v| (v, ValueSource::DefaultProfile))
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|(v, _)| v.as_string())
    }

    /// All keys visible from the active profile, with their source.
    pub fn entries(&self) -> BTreeMap<String, (ConfigValue, ValueSource)> {
        let mut out = BTreeMap::new();
        if let Some(defaults) = self.doc.profiles.get(DEFAULT_PROFILE) {
            for (k, v) in defaults {
                out.insert(k.clone(), (v.clone(), ValueSource::DefaultProfile));
            }
        }
        if let Some(active) = self.doc.profiles.get(&self.active) {
            for (k, v) in active {
                out.insert(k.clone(), (v.clone(), ValueSource::ActiveProfile));
            }
        }
        out
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.doc
            .profiles
            .entry(self.active.clone())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Removes `key` from the active profile. Returns whether it was present.
    pub fn unset(&mut self, key: &str) -> bool {
        self.doc
            .profiles
            .get_mut(&self.active)
            .map(|p| p.remove(key).is_some())
            .unwrap_or(false)
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.doc.profiles.keys().cloned().collect()
    }

    pub fn profile_exists(&self, name: &str) -> bool {
        self.doc.profiles.contains_key(name)
    }

    /// Creates a profile, optionally seeded with the active profile's values.
    pub fn create_profile(&mut self, name: &str, copy_active: bool) -> Result<()> {
        validate_profile_name(name)?;
        if self.profile_exists(name) {
            return Err(CliError::Config(format!("profile {name:?} already exists")));
        }
        let values = if copy_active {
            self.doc
                .profiles
                .get(&self.active)
                .cloned()
                .unwrap_or_default()
        } else {
            BTreeMap::new()
        };
        self.doc.profiles.insert(name.to_string(), values);
        Ok(())
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<()> {
        if name == DEFAULT_PROFILE {
            return Err(CliError::Config(
                "the default profile cannot be deleted".to_string(),
            ));
        }
        if self.doc.profiles.remove(name).is_none() {
            return Err(unknown_profile(name));
        }
        if self.doc.active == name {
            self.doc.active = DEFAULT_PROFILE.to_string();
        }
        if self.active == name {
            self.active = DEFAULT_PROFILE.to_string();
        }
        Ok(())
    }

    pub fn rename_profile(&mut self, from: &str, to: &str) -> Result<()> {
        if from == DEFAULT_PROFILE {
            return Err(CliError::Config(
                "the default profile cannot be renamed".to_string(),
            ));
        }
        validate_profile_name(to)?;
        if self.profile_exists(to) {
            return Err(CliError::Config(format!("profile {to:?} already exists")));
        }
        let values = self
            .doc
            .profiles
            .remove(from)
            .ok_or_else(|| unknown_profile(from))?;
        self.doc.profiles.insert(to.to_string(), values);
        if self.doc.active == from {
            self.doc.active = to.to_string();
        }
        if self.active == from {
            self.active = to.to_string();
        }
        Ok(())
    }

    /// Marks `name` as the persisted active profile.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.profile_exists(name) {
            return Err(unknown_profile(name));
        }
        self.doc.active = name.to_string();
        self.active = name.to_string();
        Ok(())
    }

    pub fn stored_active(&self) -> &str {
        &self.doc.active
    }

    pub fn save(&self) -> Result<()> {
        self.store.save(&self.doc)
    }
}

fn unknown_profile(name: &str) -> CliError {
    CliError::Config(format!("profile {name:?} does not exist"))
}

/// Profile names are lowercase letters, digits and `-`, starting with a
/// letter or digit.
pub fn validate_profile_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "none"
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CliError::Config(format!(
            "invalid profile name {name:?}: only lowercase letters, digits and \"-\" are allowed"
        )))
    }
}

/// The configuration directory: `STACKIT_CONFIG_DIR` if set, otherwise the
/// platform config dir for the application.
pub fn config_dir(override_dir: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("cloud", "stackit", "stackit")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| CliError::Config("could not determine the config directory".to_string()))
}
