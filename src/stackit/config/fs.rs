use super::{ConfigStore, Profiles};
use crate::error::{CliError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const PROFILES_FILENAME: &str = "profiles.json";

/// Profiles document stored as pretty JSON under the config directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PROFILES_FILENAME)
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                CliError::Config(format!("create config directory {}: {e}", path.display()))
            })?;
        }
        Ok(())
    }
}

impl ConfigStore for FileStore {
    fn load(&self) -> Result<Option<Profiles>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| CliError::Config(format!("read {}: {e}", path.display())))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let doc = serde_json::from_str(&content)
            .map_err(|e| CliError::Config(format!("parse {}: {e}", path.display())))?;
        Ok(Some(doc))
    }

    fn save(&self, profiles: &Profiles) -> Result<()> {
        self.ensure_dir(&self.dir)?;
        let path = self.path();
        let tmp = self.dir.join(format!("{PROFILES_FILENAME}.tmp"));
        let content = serde_json::to_string_pretty(profiles)?;
        fs::write(&tmp, content)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| CliError::Config(format!("write {}: {e}", path.display())))
    }

    fn location(&self) -> String {
        self.path().display().to_string()
    }
}
