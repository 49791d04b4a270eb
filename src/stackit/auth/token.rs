//! Access token inspection and service account assertions.

use crate::error::{CliError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Tokens expiring within this many seconds are refreshed before use.
pub const SAFETY_WINDOW_SECS: i64 = 60;

const ASSERTION_LIFETIME_SECS: i64 = 600;

/// Decodes the claims of a JWT without verifying its signature.
pub fn claims(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn expiry(token: &str) -> Option<i64> {
    let exp = claims(token)?.get("exp")?.clone();
    exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))
}

pub fn claim_string(token: &str, name: &str) -> Option<String> {
    claims(token)?
        .get(name)?
        .as_str()
        .map(str::to_string)
}

/// Whether `token` must be refreshed at `now`. Unparsable tokens count as
/// expired.
pub fn needs_refresh(token: &str, now: i64) -> bool {
    match expiry(token) {
        Some(exp) => exp - now < SAFETY_WINDOW_SECS,
        None => true,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub id: String,
    pub credentials: KeyCredentials,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCredentials {
    pub kid: String,
    pub iss: String,
    pub sub: String,
    pub aud: String,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl ServiceAccountKey {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CliError::Auth(format!("parse service account key: {e}")))
    }

    pub fn email(&self) -> &str {
        &self.credentials.iss
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    jti: String,
    iat: i64,
    exp: i64,
}

/// Signs the RS512 assertion exchanged for an access token.
pub fn sign_assertion(key: &ServiceAccountKey, private_key_pem: &str, now: i64) -> Result<String> {
    let mut header = Header::new(Algorithm::RS512);
    header.kid = Some(key.credentials.kid.clone());
    let claims = AssertionClaims {
        iss: &key.credentials.iss,
        sub: &key.credentials.sub,
        aud: &key.credentials.aud,
        jti: uuid::Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| CliError::Auth(format!("parse private key: {e}")))?;
    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| CliError::Auth(format!("sign service account assertion: {e}")))
}

/// Unsigned token carrying the given claims, for fakes in tests.
#[cfg(test)]
pub(crate) fn fake_jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
pub(crate) const TEST_PRIVATE_KEY: &str = include_str!("testdata/sa_private_key.pem");

#[cfg(test)]
pub(crate) fn test_key_json() -> String {
    serde_json::json!({
        "id": "key-1",
        "publicKey": "unused",
        "credentials": {
            "kid": "kid-1",
            "iss": "robot@sa.stackit.cloud",
            "sub": "8c5a4ad0-1b4f-4d5b-9f8e-2f1c6a3b7d10",
            "aud": "https://stackit-service-account-prod.apps.01.cf.eu01.stackit.cloud"
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiry_and_window() {
        let token = fake_jwt(json!({"exp": 1_000}));
        assert_eq!(expiry(&token), Some(1_000));
        assert!(!needs_refresh(&token, 900));
        assert!(needs_refresh(&token, 941));
        assert!(needs_refresh(&token, 2_000));
    }

    #[test]
    fn test_unparsable_token_needs_refresh() {
        assert!(needs_refresh("not-a-jwt", 0));
        assert!(needs_refresh("a.!!!.c", 0));
        assert!(needs_refresh(&fake_jwt(json!({"sub": "x"})), 0));
    }

    #[test]
    fn test_claim_string() {
        let token = fake_jwt(json!({"email": "me@example.com"}));
        assert_eq!(claim_string(&token, "email").as_deref(), Some("me@example.com"));
        assert_eq!(claim_string(&token, "missing"), None);
    }

    #[test]
    fn test_assertion_claims_and_header() {
        let key = ServiceAccountKey::parse(&test_key_json()).unwrap();
        let assertion = sign_assertion(&key, TEST_PRIVATE_KEY, 1_700_000_000).unwrap();

        let header = jsonwebtoken::decode_header(&assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS512);
        assert_eq!(header.kid.as_deref(), Some("kid-1"));

        let c = claims(&assertion).unwrap();
        assert_eq!(c["iss"], "robot@sa.stackit.cloud");
        assert_eq!(c["iat"], 1_700_000_000);
        assert_eq!(c["exp"], 1_700_000_600);
        assert_eq!(c["jti"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_bad_private_key_is_auth_error() {
        let key = ServiceAccountKey::parse(&test_key_json()).unwrap();
        let err = sign_assertion(&key, "-----BEGIN NOTHING-----", 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Auth);
    }
}
