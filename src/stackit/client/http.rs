use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::auth::TokenSource;
use crate::error::{CliError, Result};
use crate::print::{redact, redacted_body};
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Headers that may appear in the debug trace. Everything else, notably
/// `Authorization`, is left out.
const TRACED_HEADERS: &[&str] = &[
    "accept",
    "content-length",
    "content-type",
    "date",
    "location",
    "user-agent",
    "x-request-id",
    "x-trace-id",
];

pub struct HttpTransport {
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl HttpTransport {
    pub fn new(tokens: Arc<dyn TokenSource>, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CliError::Internal(format!("build HTTP client: {e}")))?;
        Ok(Self { client, tokens })
    }
}

fn traced_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| TRACED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| format!("{name}: {}", value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let token = self.tokens.access_token()?;
        let mut builder = self
            .client
            .request(to_reqwest(request.method), &request.url)
            .bearer_auth(token);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let http_request = builder
            .build()
            .map_err(|e| CliError::Internal(format!("build request: {e}")))?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            headers = %traced_headers(http_request.headers()),
            body = request.body.as_ref().map(|b| redact(b).to_string()).unwrap_or_default(),
            "sending request"
        );

        let response = self
            .client
            .execute(http_request)
            .map_err(|e| CliError::Remote(format!("{} {}: {e}", request.method, request.url)))?;
        let status = response.status().as_u16();
        let headers = traced_headers(response.headers());
        let body = response
            .text()
            .map_err(|e| CliError::Remote(format!("read response body: {e}")))?;
        tracing::debug!(status, headers = %headers, body = %redacted_body(&body), "received response");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};

    #[test]
    fn test_trace_drops_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let traced = traced_headers(&headers);
        assert_eq!(traced, "content-type: application/json");
        assert!(!traced.contains("secret"));
    }
}
