//! Observability API records.
//!
//! Only the fields the commands read are typed; everything else the API
//! returns is kept in `extra` so json/yaml output shows the full record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type Extra = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlansResponse {
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Instance {
    /// A string nested under `extra`, e.g. `["instance", "grafanaUrl"]`.
    pub fn extra_str(&self, path: &[&str]) -> Option<&str> {
        let (first, rest) = path.split_first()?;
        let mut value = self.extra.get(*first)?;
        for key in rest {
            value = value.get(*key)?;
        }
        value.as_str()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstancesResponse {
    #[serde(default)]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePayload {
    pub name: String,
    pub plan_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceResponse {
    #[serde(default)]
    pub instance_id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsResponse {
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCredentialsResponse {
    #[serde(default)]
    pub credentials: CreatedCredentials,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// A scrape configuration job. Also the create/update payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_configs: Option<Vec<StaticConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, Vec<String>>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Job {
    /// Payload used by `scrape-config create` when none is given.
    pub fn default_payload() -> Self {
        Self {
            job_name: Some("default-name".to_string()),
            metrics_path: Some("/metrics".to_string()),
            scheme: Some("https".to_string()),
            scrape_interval: Some("5m".to_string()),
            scrape_timeout: Some("2m".to_string()),
            static_configs: Some(vec![StaticConfig {
                labels: None,
                targets: vec!["url-target".to_string()],
            }]),
            ..Default::default()
        }
    }

    /// The same job as an update payload: the name travels in the path.
    pub fn into_update_payload(self) -> Self {
        Self {
            job_name: None,
            ..self
        }
    }

    pub fn saml2_enabled(&self) -> bool {
        !self
            .params
            .as_ref()
            .and_then(|p| p.get("saml2"))
            .and_then(|v| v.first())
            .is_some_and(|v| v == "disabled")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub data: Vec<Job>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResponse {
    #[serde(default)]
    pub data: Job,
}

/// Generic OAuth2 settings of a Grafana. Sent back unchanged on updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaOauth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_attribute_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_attribute_strict: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_pkce: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaConfigs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_oauth: Option<GrafanaOauth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_read_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_stackit_sso: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Body of `PUT .../grafana-configs`. The API replaces the whole
/// configuration, so unchanged settings are copied from the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaConfigsPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_oauth: Option<GrafanaOauth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_read_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_stackit_sso: Option<bool>,
}

impl GrafanaConfigs {
    /// The current settings with the given switches overridden.
    pub fn with_changes(
        self,
        single_sign_on: Option<bool>,
        public_read_access: Option<bool>,
    ) -> GrafanaConfigsPayload {
        GrafanaConfigsPayload {
            generic_oauth: self.generic_oauth,
            public_read_access: public_read_access.or(self.public_read_access),
            use_stackit_sso: single_sign_on.or(self.use_stackit_sso),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_payload_shape() {
        let value = serde_json::to_value(Job::default_payload()).unwrap();
        assert_eq!(
            value,
            json!({
                "jobName": "default-name",
                "metricsPath": "/metrics",
                "scheme": "https",
                "scrapeInterval": "5m",
                "scrapeTimeout": "2m",
                "staticConfigs": [{"targets": ["url-target"]}]
            })
        );
    }

    #[test]
    fn test_unknown_fields_survive() {
        let raw = json!({
            "id": "i-1",
            "name": "prod",
            "status": "CREATE_SUCCEEDED",
            "instance": {"grafanaUrl": "https://grafana.example"}
        });
        let instance: Instance = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            instance.extra_str(&["instance", "grafanaUrl"]),
            Some("https://grafana.example")
        );
        assert_eq!(serde_json::to_value(&instance).unwrap(), raw);
    }

    #[test]
    fn test_update_payload_drops_job_name() {
        let job = Job::default_payload().into_update_payload();
        assert!(job.job_name.is_none());
        assert_eq!(job.metrics_path.as_deref(), Some("/metrics"));
    }

    #[test]
    fn test_grafana_changes_keep_other_settings() {
        let configs: GrafanaConfigs = serde_json::from_value(json!({
            "genericOauth": {"apiUrl": "https://api", "enabled": true, "oauthClientSecret": "s"},
            "publicReadAccess": false,
            "useStackitSso": true,
            "grafanaVersion": "10"
        }))
        .unwrap();
        let payload = configs.with_changes(None, Some(true));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "genericOauth": {"apiUrl": "https://api", "enabled": true, "oauthClientSecret": "s"},
                "publicReadAccess": true,
                "useStackitSso": true
            })
        );
    }

    #[test]
    fn test_saml2_flag() {
        let mut job = Job::default();
        assert!(job.saml2_enabled());
        job.params = Some(BTreeMap::from([(
            "saml2".to_string(),
            vec!["disabled".to_string()],
        )]));
        assert!(!job.saml2_enabled());
    }
}
