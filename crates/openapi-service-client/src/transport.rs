//! Sending request drafts over HTTP.

use crate::config::HttpClientConfig;
use crate::error::{OpenApiError, Result};
use crate::request::RequestDraft;
use crate::types::HttpMethod;
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Sends a [`RequestDraft`] and returns the decoded JSON response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send_request(&self, draft: &RequestDraft) -> Result<Value>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with the configured timeout and default headers.
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            default_headers.insert(header_name(name)?, header_value(name, value)?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn prepare(&self, draft: &RequestDraft) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.client.request(method(draft.method), &draft.url);

        // Draft headers replace same-named client defaults.
        for (name, value) in &draft.headers {
            builder = builder.header(header_name(name)?, header_value(name, value)?);
        }

        let query = query_pairs(&draft.params);
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        if !draft.cookies.is_empty() {
            let cookie = draft
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, header_value("Cookie", &cookie)?);
        }

        if let Some(auth) = &draft.auth {
            builder = builder.basic_auth(&auth.username, auth.password.as_ref());
        }

        if let Some(body) = &draft.json {
            builder = builder.json(body);
        }

        Ok(builder)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send_request(&self, draft: &RequestDraft) -> Result<Value> {
        let response = self.prepare(draft)?.send().await?;
        let status = response.status();

        debug!("Response status: {}", status);

        let bytes = response.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).to_string();
            error!(
                "API request failed: {} {} - Status: {} - Error: {}",
                draft.method, draft.url, status, body
            );
            return Err(OpenApiError::Transport {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| OpenApiError::Transport {
            status: Some(status.as_u16()),
            message: format!(
                "response is not valid JSON ({}): {}",
                e,
                String::from_utf8_lossy(&bytes)
            ),
        })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Trace => Method::TRACE,
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| OpenApiError::transport(format!("invalid header name '{}': {}", name, e)))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| OpenApiError::transport(format!("invalid value for header '{}': {}", name, e)))
}

/// Scalars are stringified; arrays become one pair per item.
fn query_pairs(params: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, value) in params {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (name.clone(), query_value(item))));
            }
            other => pairs.push((name.clone(), query_value(other))),
        }
    }
    pairs
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
