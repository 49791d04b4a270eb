//! `stackit auth`: service account activation and logout.
//!
//! Credentials are stored per profile; nothing here ever prints a token.

use crate::auth::endpoint::HttpTokenEndpoint;
use crate::auth::storage::CredentialStore;
use crate::auth::{self, AuthSettings, ServiceAccountSecret};
use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::error::{CliError, Result, ResultExt};
use crate::examples::Example;
use serde::Serialize;
use std::fs;

const SA_TOKEN_FLAG: &str = "service-account-token";
const SA_KEY_PATH_FLAG: &str = "service-account-key-path";
const PRIVATE_KEY_PATH_FLAG: &str = "private-key-path";

pub fn command() -> CommandNode {
    CommandNode::group(
        "auth",
        "Authenticates the STACKIT CLI",
        "Authenticates in the STACKIT CLI.",
    )
    .with_children(vec![activate_service_account_command(), logout_command()])
}

fn activate_service_account_command() -> CommandNode {
    CommandNode::leaf(
        "activate-service-account",
        "Authenticates using a service account",
        "Authenticates to the CLI using service account credentials.\nSubsequent commands will be authenticated using the service account credentials provided.\nFor more details on how to configure your service account, check our Authentication guide at https://github.com/stackitcloud/stackit-cli/blob/main/AUTHENTICATION.md.",
        activate_service_account,
    )
    .with_flags(vec![
        FlagSpec::value(SA_TOKEN_FLAG, "Service account long-lived access token"),
        FlagSpec::value(SA_KEY_PATH_FLAG, "Service account key path"),
        FlagSpec::value(
            PRIVATE_KEY_PATH_FLAG,
            "RSA private key path. It takes precedence over the private key included in the service account key, if present",
        ),
    ])
    .with_examples(vec![
        Example::new(
            "Activate service account authentication in the STACKIT CLI using a service account key which includes the private key",
            &["$ stackit auth activate-service-account --service-account-key-path path/to/service_account_key.json"],
        ),
        Example::new(
            "Activate service account authentication in the STACKIT CLI using the service account key and explicitly providing the private key in a PEM encoded file, which will take precedence over the one in the service account key",
            &["$ stackit auth activate-service-account --service-account-key-path path/to/service_account_key.json --private-key-path path/to/private.key"],
        ),
        Example::new(
            "Activate service account authentication in the STACKIT CLI using the service account token",
            &["$ stackit auth activate-service-account --service-account-token my-service-account-token"],
        ),
    ])
}

fn logout_command() -> CommandNode {
    CommandNode::leaf(
        "logout",
        "Logs the user account out of the STACKIT CLI",
        "Logs the user account out of the STACKIT CLI.",
        logout,
    )
    .with_examples(vec![Example::new(
        "Log out of the STACKIT CLI.",
        &["$ stackit auth logout"],
    )])
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    service_account_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_account_key_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key_path: Option<String>,
}

fn read_file(path: &str, what: &str) -> Result<String> {
    fs::read_to_string(path).context(&format!("read {what} from {path:?}"))
}

fn activate_service_account(inv: &mut Invocation) -> Result<()> {
    let flags = inv.flags();
    flags.ensure_exclusive(&[SA_TOKEN_FLAG, SA_KEY_PATH_FLAG])?;
    let input = ActivateInput {
        service_account_token: flags.string_opt(SA_TOKEN_FLAG).filter(|t| !t.is_empty()),
        service_account_key_path: flags.string_opt(SA_KEY_PATH_FLAG).filter(|p| !p.is_empty()),
        private_key_path: flags.string_opt(PRIVATE_KEY_PATH_FLAG).filter(|p| !p.is_empty()),
    };
    inv.debug_input(&input);

    let secret = match (&input.service_account_token, &input.service_account_key_path) {
        (Some(token), _) => ServiceAccountSecret::Token(token.clone()),
        (None, Some(key_path)) => ServiceAccountSecret::Key {
            key_json: read_file(key_path, "service account key")?,
            private_key: input
                .private_key_path
                .as_deref()
                .map(|path| read_file(path, "private key"))
                .transpose()?,
        },
        (None, None) => {
            let token = inv.printer.prompt_for_password("Service Account Token")?;
            if token.trim().is_empty() {
                return Err(CliError::Auth(format!(
                    "either --{SA_TOKEN_FLAG} or --{SA_KEY_PATH_FLAG} must be provided"
                )));
            }
            ServiceAccountSecret::Token(token.trim().to_string())
        }
    };

    let store = CredentialStore::new(&inv.config_dir);
    let settings = AuthSettings::resolve(&inv.config, inv.env);
    let endpoint = HttpTokenEndpoint::new()?;
    let email = auth::activate_service_account(
        &store,
        inv.config.active_profile(),
        &settings,
        &endpoint,
        secret,
    )?;

    inv.printer.info(format!(
        "You have been successfully authenticated to the STACKIT CLI!\nService account email: {email}"
    ));
    Ok(())
}

fn logout(inv: &mut Invocation) -> Result<()> {
    let profile = inv.config.active_profile().to_string();
    let store = CredentialStore::new(&inv.config_dir);
    if !auth::logout(&store, &profile).context("log out")? {
        inv.printer
            .verbose(format!("no credentials stored for profile {profile:?}"));
    }
    inv.printer
        .info("Successfully logged out of the STACKIT CLI.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::auth::storage::{AuthFlow, CredentialStore};
    use crate::auth::token::fake_jwt;
    use crate::cli::invocation::testing::Harness;
    use crate::config::keys;
    use crate::env::Environment;
    use crate::error::ErrorKind;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn harness(input: &str) -> (Harness, TempDir) {
        let dir = tempdir().unwrap();
        let mut h = Harness::new(input);
        h.env = Environment::from_pairs([(keys::CONFIG_DIR_ENV, dir.path().to_str().unwrap())]);
        (h, dir)
    }

    #[test]
    fn test_activate_with_token_stores_credentials() {
        let (h, dir) = harness("");
        let token = fake_jwt(json!({"email": "robot@sa.stackit.cloud", "exp": 4_000_000_000i64}));
        h.run(&["auth", "activate-service-account", "--service-account-token", &token])
            .unwrap();

        let stored = CredentialStore::new(dir.path())
            .load("default")
            .unwrap()
            .unwrap();
        assert_eq!(stored.auth_flow_type, Some(AuthFlow::SaToken));
        assert_eq!(stored.service_account_email.as_deref(), Some("robot@sa.stackit.cloud"));
        assert!(stored.session_expires_at_unix.is_some());

        let err = h.err.contents();
        assert!(err.contains("successfully authenticated"));
        assert!(err.contains("Service account email: robot@sa.stackit.cloud"));
        assert!(!h.out.contents().contains(&token));
        assert!(!err.contains(&token));
    }

    #[test]
    fn test_activate_prompts_for_token() {
        let token = fake_jwt(json!({"sub": "robot@sa.stackit.cloud"}));
        let (h, dir) = harness(&format!("{token}\n"));
        h.run(&["auth", "activate-service-account"]).unwrap();
        assert!(CredentialStore::new(dir.path()).load("default").unwrap().is_some());
    }

    #[test]
    fn test_token_and_key_are_exclusive() {
        let (h, dir) = harness("");
        let err = h
            .run(&[
                "auth", "activate-service-account", "--service-account-token", "t",
                "--service-account-key-path", "key.json",
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(CredentialStore::new(dir.path()).load("default").unwrap().is_none());
    }

    #[test]
    fn test_missing_key_file() {
        let (h, _dir) = harness("");
        let err = h
            .run(&[
                "auth", "activate-service-account", "--service-account-key-path",
                "/nonexistent/key.json",
            ])
            .unwrap_err();
        assert!(err.to_string().contains("read service account key"), "{err}");
    }

    #[test]
    fn test_logout_removes_credentials() {
        let (h, dir) = harness("");
        let token = fake_jwt(json!({"email": "robot@sa.stackit.cloud"}));
        h.run(&["auth", "activate-service-account", "--service-account-token", &token])
            .unwrap();
        h.run(&["auth", "logout"]).unwrap();
        assert!(CredentialStore::new(dir.path()).load("default").unwrap().is_none());
        assert!(h.err.contents().contains("Successfully logged out"));
        h.run(&["auth", "logout"]).unwrap();
    }
}
