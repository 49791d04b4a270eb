//! # Service clients
//!
//! Leaves talk to the backend through a [`ServiceClient`]: a base URL plus a
//! [`Transport`]. The transport is the only piece that touches the network
//! ([`http::HttpTransport`] injects the bearer token and performs the call);
//! tests substitute a scripted one.
//!
//! Base URLs come from [`ClientFactory`]: the `<service>-custom-endpoint`
//! config key when set, otherwise the service default. `{region}` in either
//! is replaced with the region in force. Clients are built per invocation and
//! never cached.

pub mod http;

use crate::config::{keys, Config};
use crate::env::Environment;
use crate::error::{CliError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error for a non-2xx response. The message is the body's `message`
    /// field when present, the raw body otherwise.
    pub fn into_error(self) -> CliError {
        let message = serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                let body = self.body.trim();
                if body.is_empty() {
                    status_text(self.status).to_string()
                } else {
                    body.to_string()
                }
            });
        if self.status == 404 {
            CliError::NotFound { message }
        } else {
            CliError::Api {
                status: self.status,
                message,
            }
        }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not found",
        409 => "conflict",
        500 => "internal server error",
        502 => "bad gateway",
        503 => "service unavailable",
        _ => "unexpected status",
    }
}

pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Observability,
    ResourceManager,
}

impl Service {
    pub fn name(self) -> &'static str {
        match self {
            Service::Observability => "observability",
            Service::ResourceManager => "resource-manager",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Service::Observability => "https://argus.api.stackit.cloud",
            Service::ResourceManager => "https://resource-manager.api.stackit.cloud",
        }
    }

    pub fn endpoint_key(self) -> &'static str {
        match self {
            Service::Observability => keys::OBSERVABILITY_CUSTOM_ENDPOINT,
            Service::ResourceManager => keys::RESOURCE_MANAGER_CUSTOM_ENDPOINT,
        }
    }
}

pub struct ServiceClient {
    base_url: String,
    transport: Rc<dyn Transport>,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>, transport: Rc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn execute(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> Result<String> {
        let request = ApiRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            body,
        };
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(response.into_error());
        }
        Ok(response.body)
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
        let body = if body.trim().is_empty() { "null" } else { body };
        serde_json::from_str(body)
            .map_err(|e| CliError::Internal(format!("decode response body: {e}")))
    }

    fn encode<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(body)?)
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Self::decode(&self.execute(Method::Get, path, None)?)
    }

    pub fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = Self::encode(body)?;
        Self::decode(&self.execute(Method::Post, path, Some(body))?)
    }

    pub fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = Self::encode(body)?;
        Self::decode(&self.execute(Method::Put, path, Some(body))?)
    }

    pub fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = Self::encode(body)?;
        Self::decode(&self.execute(Method::Patch, path, Some(body))?)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::Delete, path, None).map(|_| ())
    }
}

pub struct ClientFactory<'a> {
    config: &'a Config,
    env: &'a Environment,
    region: String,
    transport: Rc<dyn Transport>,
}

impl<'a> ClientFactory<'a> {
    pub fn new(
        config: &'a Config,
        env: &'a Environment,
        region: impl Into<String>,
        transport: Rc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            env,
            region: region.into(),
            transport,
        }
    }

    /// Base URL for `service`: env override, profile override, default.
    pub fn endpoint(&self, service: Service) -> String {
        let key = service.endpoint_key();
        let template = self
            .env
            .config_value(key)
            .map(str::to_string)
            .or_else(|| self.config.get_string(key).filter(|v| !v.is_empty()))
            .unwrap_or_else(|| service.default_endpoint().to_string());
        template.replace("{region}", &self.region)
    }

    pub fn for_service(&self, service: Service) -> ServiceClient {
        let endpoint = self.endpoint(service);
        tracing::debug!(service = service.name(), %endpoint, "configured API client");
        ServiceClient::new(endpoint, Rc::clone(&self.transport))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Transport answering from a script and recording every request.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: RefCell<VecDeque<(u16, String)>>,
        pub requests: RefCell<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Rc<Self> {
            Rc::new(Self::default())
        }

        pub fn respond(&self, status: u16, body: &str) {
            self.responses
                .borrow_mut()
                .push_back((status, body.to_string()));
        }

        pub fn methods(&self) -> Vec<(Method, String)> {
            self.requests
                .borrow()
                .iter()
                .map(|r| (r.method, r.url.clone()))
                .collect()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            self.requests.borrow_mut().push(request.clone());
            let (status, body) = self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or((500, "{\"message\":\"no scripted response\"}".to_string()));
            Ok(ApiResponse { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::config::memory::MemoryStore;
    use crate::config::ConfigValue;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_error_message_from_body() {
        let err = ApiResponse {
            status: 409,
            body: "{\"message\":\"instance is busy\"}".into(),
        }
        .into_error();
        assert_eq!(err.to_string(), "request failed (409): instance is busy");
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[test]
    fn test_404_maps_to_not_found() {
        let err = ApiResponse {
            status: 404,
            body: String::new(),
        }
        .into_error();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "request failed (404): not found");
    }

    #[test]
    fn test_client_joins_paths_and_decodes() {
        let transport = ScriptedTransport::new();
        transport.respond(200, "{\"name\":\"demo\"}");
        let client = ServiceClient::new("https://api.example/", transport.clone());
        let body: serde_json::Value = client.get("/v1/things/1").unwrap();
        assert_eq!(body, json!({"name": "demo"}));
        assert_eq!(
            transport.methods(),
            vec![(Method::Get, "https://api.example/v1/things/1".to_string())]
        );
    }

    #[test]
    fn test_empty_success_body_decodes_as_null() {
        let transport = ScriptedTransport::new();
        transport.respond(202, "");
        let client = ServiceClient::new("https://api.example", transport);
        let body: Option<serde_json::Value> = client.post("/x", &json!({"a": 1})).unwrap();
        assert!(body.is_none());
    }

    #[test]
    fn test_endpoint_precedence_and_region() {
        let mut config = Config::load(Box::new(MemoryStore::new()), None).unwrap();
        let transport: Rc<dyn Transport> = ScriptedTransport::new();

        let env = Environment::default();
        let factory = ClientFactory::new(&config, &env, "eu01", Rc::clone(&transport));
        assert_eq!(
            factory.endpoint(Service::Observability),
            "https://argus.api.stackit.cloud"
        );

        config.set(
            keys::OBSERVABILITY_CUSTOM_ENDPOINT,
            ConfigValue::String("https://obs.{region}.internal".into()),
        );
        let factory = ClientFactory::new(&config, &env, "eu02", Rc::clone(&transport));
        assert_eq!(
            factory.endpoint(Service::Observability),
            "https://obs.eu02.internal"
        );

        let env = Environment::from_pairs([(
            "STACKIT_OBSERVABILITY_CUSTOM_ENDPOINT",
            "http://127.0.0.1:9999",
        )]);
        let factory = ClientFactory::new(&config, &env, "eu02", transport);
        assert_eq!(
            factory.for_service(Service::Observability).base_url(),
            "http://127.0.0.1:9999"
        );
    }
}
