//! Credential files.
//!
//! One JSON document per profile under `<config dir>/credentials/`, written
//! with mode 0600. Writers that update tokens take `<profile>.json.lock`
//! first; the lock is a plain file created with `create_new` and removed when
//! the guard drops.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const CREDENTIALS_DIR: &str = "credentials";
const LOCK_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlow {
    UserToken,
    SaToken,
    SaKey,
}

impl AuthFlow {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthFlow::UserToken => "user_token",
            AuthFlow::SaToken => "sa_token",
            AuthFlow::SaKey => "sa_key",
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_flow_type: Option<AuthFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_email: Option<String>,
    /// The service account key JSON, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_key: Option<String>,
    /// PEM private key, when not embedded in the key JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_expires_at_unix: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_custom_endpoint: Option<String>,
}

impl Credentials {
    /// The identity behind the credentials, for messages.
    pub fn principal(&self) -> Option<&str> {
        self.user_email
            .as_deref()
            .or(self.service_account_email.as_deref())
    }
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_flow_type", &self.auth_flow_type)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("service_account_token", &redact(&self.service_account_token))
            .field("service_account_email", &self.service_account_email)
            .field("service_account_key", &redact(&self.service_account_key))
            .field("private_key", &redact(&self.private_key))
            .field("session_expires_at_unix", &self.session_expires_at_unix)
            .field("user_email", &self.user_email)
            .field("idp_token_endpoint", &self.idp_token_endpoint)
            .field("token_custom_endpoint", &self.token_custom_endpoint)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Store rooted at the config directory.
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: config_dir.as_ref().join(CREDENTIALS_DIR),
        }
    }

    pub fn path(&self, profile: &str) -> PathBuf {
        self.dir.join(format!("{profile}.json"))
    }

    fn lock_path(&self, profile: &str) -> PathBuf {
        self.dir.join(format!("{profile}.json.lock"))
    }

    pub fn load(&self, profile: &str) -> Result<Option<Credentials>> {
        let path = self.path(profile);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CliError::Auth(format!(
                    "read credentials {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CliError::Auth(format!("parse credentials {}: {e}", path.display())))
    }

    pub fn save(&self, profile: &str, credentials: &Credentials) -> Result<()> {
        create_private_dir(&self.dir)?;
        let path = self.path(profile);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(credentials)?;
        {
            let mut file = open_private(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Removes the profile's credentials. Returns whether a file existed.
    pub fn delete(&self, profile: &str) -> Result<bool> {
        match fs::remove_file(self.path(profile)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Moves the credentials of `from` to `to`. Returns whether a file existed.
    pub fn rename(&self, from: &str, to: &str) -> Result<bool> {
        match fs::rename(self.path(from), self.path(to)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Takes the profile's lock file, waiting up to `timeout`.
    ///
    /// `Ok(None)` means another process held the lock for the whole period.
    pub fn try_lock(&self, profile: &str, timeout: Duration) -> Result<Option<CredentialLock>> {
        create_private_dir(&self.dir)?;
        let path = self.lock_path(profile);
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Some(CredentialLock { path })),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Held lock file; removed on drop.
#[derive(Debug)]
pub struct CredentialLock {
    path: PathBuf,
}

impl Drop for CredentialLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Credentials {
        Credentials {
            auth_flow_type: Some(AuthFlow::SaToken),
            access_token: Some("secret-access".into()),
            service_account_token: Some("secret-sa".into()),
            service_account_email: Some("robot@sa.stackit.cloud".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        assert!(store.load("default").unwrap().is_none());
        assert!(!store.delete("default").unwrap());
    }

    #[test]
    fn test_rename_moves_credentials() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        assert!(!store.rename("dev", "prod").unwrap());
        store.save("dev", &sample()).unwrap();
        assert!(store.rename("dev", "prod").unwrap());
        assert!(store.load("dev").unwrap().is_none());
        assert_eq!(store.load("prod").unwrap(), Some(sample()));
    }

    #[test]
    fn test_save_load_delete() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.save("dev", &sample()).unwrap();
        assert_eq!(store.load("dev").unwrap(), Some(sample()));
        assert!(store.load("default").unwrap().is_none());
        assert!(store.delete("dev").unwrap());
        assert!(store.load("dev").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.save("default", &sample()).unwrap();
        let mode = fs::metadata(store.path("default"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_flow_type_wire_names() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"auth_flow_type\":\"sa_token\""));
        assert!(!json.contains("refresh_token"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let shown = format!("{:?}", sample());
        assert!(!shown.contains("secret-access"));
        assert!(!shown.contains("secret-sa"));
        assert!(shown.contains("robot@sa.stackit.cloud"));
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let held = store
            .try_lock("default", Duration::from_millis(10))
            .unwrap()
            .expect("first lock");
        assert!(store
            .try_lock("default", Duration::from_millis(60))
            .unwrap()
            .is_none());
        drop(held);
        assert!(store
            .try_lock("default", Duration::from_millis(10))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_malformed_file_is_auth_error() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        fs::create_dir_all(dir.path().join(CREDENTIALS_DIR)).unwrap();
        fs::write(store.path("default"), "{not json").unwrap();
        let err = store.load("default").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Auth);
    }
}
