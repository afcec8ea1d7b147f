//! HTTP executor backed by `ureq`.
//!
//! `ureq` is blocking, so every call runs inside
//! `tokio::task::spawn_blocking`. Status codes are never turned into errors:
//! a 404 or 500 is a response for the orchestrator to judge.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use vouch_core::{HttpRequest, HttpResponse, Value};

use crate::executor::{Executor, TransportError};

/// Sends requests to a live service rooted at `base_url`.
#[derive(Clone)]
pub struct HttpExecutor {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, None)
    }

    /// `timeout` bounds each whole request; `None` waits indefinitely.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build();
        HttpExecutor {
            base_url: base_url.into(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a request: base URL, path, then the query map.
    pub fn url_for(&self, request: &HttpRequest) -> String {
        let mut url = if request.path.starts_with("http://") || request.path.starts_with("https://") {
            request.path.clone()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                request.path.trim_start_matches('/')
            )
        };
        if !request.query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encode_query(&request.query));
        }
        url
    }
}

fn encode_query(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

fn send(
    agent: &ureq::Agent,
    url: &str,
    request: &HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let failed = |message: String| TransportError::Request {
        url: url.to_string(),
        message,
    };

    let mut builder = ureq::http::Request::builder()
        .method(request.method.to_uppercase().as_str())
        .uri(url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let outcome = match &request.body {
        Value::Null => {
            let prepared = builder
                .body(())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            agent.run(prepared)
        }
        body => {
            if request.header("content-type").is_none() {
                builder = builder.header("content-type", "application/json");
            }
            let text = match body.as_str() {
                Some(text) => text.to_string(),
                None => body.to_string(),
            };
            let prepared = builder
                .body(text)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            agent.run(prepared)
        }
    };
    let mut response = outcome.map_err(|e| failed(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| failed(format!("failed to read response body: {}", e)))?;

    Ok(HttpResponse {
        status,
        headers,
        body: Value::from_text(&text),
    })
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(request);
        debug!(method = %request.method, %url, "sending request");

        let agent = self.agent.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || send(&agent, &url, &request))
            .await
            .map_err(|e| TransportError::Task(format!("task join error: {}", e)))?
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
