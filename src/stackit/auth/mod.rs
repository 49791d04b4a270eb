//! # Authentication
//!
//! Every API request carries a bearer token obtained from a [`TokenSource`].
//! Two sources exist:
//!
//! - [`StaticToken`]: `STACKIT_ACCESS_TOKEN` is set. The credential store is
//!   never read.
//! - [`Authenticator`]: the active profile's credential file (see
//!   [`storage`]). It is read on the first request, not at startup, so
//!   commands that fail validation never touch it.
//!
//! Credential modes:
//!
//! | flow         | token used                       | refresh                                 |
//! |--------------|----------------------------------|-----------------------------------------|
//! | `user_token` | `access_token`                   | `refresh_token` grant at the IdP        |
//! | `sa_token`   | `service_account_token`          | none, long-lived                        |
//! | `sa_key`     | `access_token`                   | RS512 assertion exchanged for a token   |
//!
//! A token is refreshed when it expires within [`token::SAFETY_WINDOW_SECS`].
//! The refresh runs while holding the credential mutex, so concurrent callers
//! wait for the one in flight and reuse its result. A failed refresh is
//! retried once. Refreshed tokens are written back under the credential lock
//! file; when the lock cannot be taken they live in memory for this process
//! only.

pub mod endpoint;
pub mod storage;
pub mod token;

use crate::config::{keys, Config};
use crate::env::Environment;
use crate::error::{CliError, Result, FAILED_SERVICE_ACCOUNT_ACTIVATION};
use crate::flags::{parse_duration, DurationBounds};
use endpoint::{
    HttpTokenEndpoint, TokenEndpoint, TokenResponse, DEFAULT_IDP_CLIENT_ID,
    DEFAULT_IDP_TOKEN_ENDPOINT, DEFAULT_SA_TOKEN_ENDPOINT,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::{AuthFlow, CredentialStore, Credentials};
use token::ServiceAccountKey;

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_SESSION_TIME_LIMIT: &str = "2h";
const SESSION_EXPIRED: &str = "your session has expired, please authenticate again.

You can authenticate as a user by running:
  $ stackit auth login

or use a service account by running:
  $ stackit auth activate-service-account";

pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Result<String>;
}

pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Endpoints and limits used by the token flows.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub idp_token_endpoint: String,
    pub idp_client_id: String,
    pub sa_token_endpoint: String,
    pub session_time_limit: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            idp_token_endpoint: DEFAULT_IDP_TOKEN_ENDPOINT.to_string(),
            idp_client_id: DEFAULT_IDP_CLIENT_ID.to_string(),
            sa_token_endpoint: DEFAULT_SA_TOKEN_ENDPOINT.to_string(),
            session_time_limit: DEFAULT_SESSION_TIME_LIMIT.to_string(),
        }
    }
}

impl AuthSettings {
    pub fn resolve(config: &Config, env: &Environment) -> Self {
        let lookup = |key: &str| {
            env.config_value(key)
                .map(str::to_string)
                .or_else(|| config.get_string(key))
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            idp_token_endpoint: lookup(keys::IDP_CUSTOM_ENDPOINT)
                .unwrap_or(defaults.idp_token_endpoint),
            idp_client_id: lookup(keys::IDP_CUSTOM_CLIENT_ID).unwrap_or(defaults.idp_client_id),
            sa_token_endpoint: lookup(keys::TOKEN_CUSTOM_ENDPOINT)
                .unwrap_or(defaults.sa_token_endpoint),
            session_time_limit: lookup(keys::SESSION_TIME_LIMIT)
                .unwrap_or(defaults.session_time_limit),
        }
    }

    pub fn session_time_limit_secs(&self) -> Result<i64> {
        let bounds = DurationBounds {
            min: Some(60),
            max: None,
        };
        let secs = parse_duration(&self.session_time_limit, bounds, chrono::Utc::now())
            .map_err(|e| CliError::Config(format!("invalid {}: {e}", keys::SESSION_TIME_LIMIT)))?;
        Ok(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct Authenticator {
    profile: String,
    store: CredentialStore,
    settings: AuthSettings,
    endpoint: Box<dyn TokenEndpoint>,
    state: Mutex<Option<Credentials>>,
    now: fn() -> i64,
}

impl Authenticator {
    pub fn new(
        profile: impl Into<String>,
        store: CredentialStore,
        settings: AuthSettings,
        endpoint: Box<dyn TokenEndpoint>,
    ) -> Self {
        Self {
            profile: profile.into(),
            store,
            settings,
            endpoint,
            state: Mutex::new(None),
            now: unix_now,
        }
    }

    pub fn with_clock(mut self, now: fn() -> i64) -> Self {
        self.now = now;
        self
    }

    fn request_token(&self, flow: AuthFlow, credentials: &Credentials, now: i64) -> Result<TokenResponse> {
        match flow {
            AuthFlow::UserToken => {
                let refresh_token = credentials
                    .refresh_token
                    .as_deref()
                    .ok_or(CliError::NotAuthenticated)?;
                let url = credentials
                    .idp_token_endpoint
                    .as_deref()
                    .unwrap_or(&self.settings.idp_token_endpoint);
                self.endpoint
                    .refresh_user_token(url, &self.settings.idp_client_id, refresh_token)
            }
            AuthFlow::SaKey => {
                let key_json = credentials
                    .service_account_key
                    .as_deref()
                    .ok_or(CliError::NotAuthenticated)?;
                let key = ServiceAccountKey::parse(key_json)?;
                let private_key = credentials
                    .private_key
                    .as_deref()
                    .or(key.credentials.private_key.as_deref())
                    .ok_or_else(|| CliError::Auth("the service account private key is missing".into()))?;
                let assertion = token::sign_assertion(&key, private_key, now)?;
                let url = credentials
                    .token_custom_endpoint
                    .as_deref()
                    .unwrap_or(&self.settings.sa_token_endpoint);
                self.endpoint.exchange_assertion(url, &assertion)
            }
            AuthFlow::SaToken => Err(CliError::Internal(
                "service account tokens are not refreshed".into(),
            )),
        }
    }

    fn refresh(&self, flow: AuthFlow, credentials: &Credentials, now: i64) -> Result<TokenResponse> {
        match self.request_token(flow, credentials, now) {
            Ok(response) => Ok(response),
            Err(first) => {
                tracing::debug!(error = %first, flow = flow.as_str(), "token refresh failed, retrying once");
                self.request_token(flow, credentials, now).map_err(|e| {
                    CliError::Auth(format!("refresh access token: {e}"))
                })
            }
        }
    }

    fn persist(&self, credentials: &Credentials) {
        match self.store.try_lock(&self.profile, LOCK_TIMEOUT) {
            Ok(Some(_lock)) => {
                if let Err(e) = self.store.save(&self.profile, credentials) {
                    tracing::debug!(error = %e, "could not persist refreshed token, keeping it in memory");
                }
            }
            Ok(None) => tracing::debug!(
                profile = %self.profile,
                "credentials are locked by another process, keeping refreshed token in memory"
            ),
            Err(e) => tracing::debug!(error = %e, "could not lock credentials, keeping refreshed token in memory"),
        }
    }
}

impl TokenSource for Authenticator {
    fn access_token(&self) -> Result<String> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CliError::Internal("credential state lock poisoned".into()))?;
        if state.is_none() {
            let loaded = self
                .store
                .load(&self.profile)?
                .ok_or(CliError::NotAuthenticated)?;
            tracing::debug!(profile = %self.profile, flow = ?loaded.auth_flow_type, "loaded credentials");
            *state = Some(loaded);
        }
        let credentials = state.as_mut().ok_or(CliError::NotAuthenticated)?;

        let now = (self.now)();
        if credentials
            .session_expires_at_unix
            .is_some_and(|expires_at| expires_at <= now)
        {
            return Err(CliError::Auth(SESSION_EXPIRED.to_string()));
        }

        let flow = credentials
            .auth_flow_type
            .ok_or(CliError::NotAuthenticated)?;
        if flow == AuthFlow::SaToken {
            return credentials
                .service_account_token
                .clone()
                .or_else(|| credentials.access_token.clone())
                .ok_or(CliError::NotAuthenticated);
        }
        if let Some(current) = credentials.access_token.as_deref() {
            if !token::needs_refresh(current, now) {
                return Ok(current.to_string());
            }
        }

        let response = self.refresh(flow, credentials, now)?;
        credentials.access_token = Some(response.access_token.clone());
        if let Some(refresh_token) = response.refresh_token {
            credentials.refresh_token = Some(refresh_token);
        }
        self.persist(credentials);
        Ok(response.access_token)
    }
}

/// The token source for this process.
pub fn token_source(env: &Environment, config: &Config, config_dir: &Path) -> Result<Arc<dyn TokenSource>> {
    if let Some(token) = env.get(keys::ACCESS_TOKEN_ENV) {
        tracing::debug!("using access token from {}", keys::ACCESS_TOKEN_ENV);
        return Ok(Arc::new(StaticToken::new(token)));
    }
    Ok(Arc::new(Authenticator::new(
        config.active_profile(),
        CredentialStore::new(config_dir),
        AuthSettings::resolve(config, env),
        Box::new(HttpTokenEndpoint::new()?),
    )))
}

pub enum ServiceAccountSecret {
    Token(String),
    Key {
        key_json: String,
        private_key: Option<String>,
    },
}

/// Stores service account credentials for `profile` after checking they can
/// produce a token. Returns the service account email.
pub fn activate_service_account(
    store: &CredentialStore,
    profile: &str,
    settings: &AuthSettings,
    endpoint: &dyn TokenEndpoint,
    secret: ServiceAccountSecret,
) -> Result<String> {
    let now = unix_now();
    let session_expires_at = now.saturating_add(settings.session_time_limit_secs()?);

    let credentials = build_service_account_credentials(settings, endpoint, secret, now)
        .map_err(|e| {
            tracing::debug!(error = %e, "service account activation failed");
            CliError::Auth(FAILED_SERVICE_ACCOUNT_ACTIVATION.to_string())
        })?;
    let credentials = Credentials {
        session_expires_at_unix: Some(session_expires_at),
        ..credentials
    };

    let _lock = store
        .try_lock(profile, LOCK_TIMEOUT)?
        .ok_or_else(|| CliError::Auth("the credentials file is locked by another process".into()))?;
    store.save(profile, &credentials)?;
    Ok(credentials
        .service_account_email
        .clone()
        .unwrap_or_default())
}

fn build_service_account_credentials(
    settings: &AuthSettings,
    endpoint: &dyn TokenEndpoint,
    secret: ServiceAccountSecret,
    now: i64,
) -> Result<Credentials> {
    match secret {
        ServiceAccountSecret::Token(sa_token) => {
            let email = token::claim_string(&sa_token, "email")
                .or_else(|| token::claim_string(&sa_token, "sub"));
            Ok(Credentials {
                auth_flow_type: Some(AuthFlow::SaToken),
                access_token: Some(sa_token.clone()),
                service_account_token: Some(sa_token),
                service_account_email: email,
                ..Default::default()
            })
        }
        ServiceAccountSecret::Key {
            key_json,
            private_key,
        } => {
            let key = ServiceAccountKey::parse(&key_json)?;
            let pem = private_key
                .as_deref()
                .or(key.credentials.private_key.as_deref())
                .ok_or_else(|| CliError::Auth("the service account private key is missing".into()))?;
            let assertion = token::sign_assertion(&key, pem, now)?;
            let response = endpoint.exchange_assertion(&settings.sa_token_endpoint, &assertion)?;
            Ok(Credentials {
                auth_flow_type: Some(AuthFlow::SaKey),
                access_token: Some(response.access_token),
                service_account_email: Some(key.email().to_string()),
                service_account_key: Some(key_json),
                private_key,
                token_custom_endpoint: Some(settings.sa_token_endpoint.clone()),
                ..Default::default()
            })
        }
    }
}

/// Removes the profile's stored credentials. Returns whether any existed.
pub fn logout(store: &CredentialStore, profile: &str) -> Result<bool> {
    store.delete(profile)
}
