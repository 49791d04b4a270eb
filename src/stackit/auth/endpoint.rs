use crate::error::{CliError, Result};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_IDP_TOKEN_ENDPOINT: &str = "https://accounts.stackit.cloud/oauth/v2/token";
pub const DEFAULT_IDP_CLIENT_ID: &str = "stackit-cli-0000-0000-000000000001";
pub const DEFAULT_SA_TOKEN_ENDPOINT: &str = "https://service-account.api.stackit.cloud/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The identity provider's token endpoint.
pub trait TokenEndpoint: Send + Sync {
    fn refresh_user_token(&self, url: &str, client_id: &str, refresh_token: &str)
        -> Result<TokenResponse>;

    fn exchange_assertion(&self, url: &str, assertion: &str) -> Result<TokenResponse>;
}

pub struct HttpTokenEndpoint {
    client: reqwest::blocking::Client,
}

impl HttpTokenEndpoint {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CliError::Internal(format!("build token client: {e}")))?;
        Ok(Self { client })
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        tracing::debug!(%url, grant_type = form[0].1, "requesting access token");
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .map_err(|e| CliError::Remote(format!("call token endpoint: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| CliError::Remote(format!("read token response: {e}")))?;
        tracing::debug!(status = status.as_u16(), "token endpoint responded");
        if !status.is_success() {
            return Err(CliError::Auth(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }
        serde_json::from_str(&body)
            .map_err(|e| CliError::Auth(format!("parse token response: {e}")))
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    fn refresh_user_token(
        &self,
        url: &str,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        self.post_form(
            url,
            &[
                ("grant_type", "refresh_token"),
                ("client_id", client_id),
                ("refresh_token", refresh_token),
            ],
        )
    }

    fn exchange_assertion(&self, url: &str, assertion: &str) -> Result<TokenResponse> {
        self.post_form(url, &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
    }
}
