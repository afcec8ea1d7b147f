//! Completion monitor for deferred (202 Accepted) operations.
//!
//! When a service answers 202 with a `Link` entry titled `monitor`, the real
//! outcome is published at that link. The monitor:
//!
//! 1. confirms the 202 against the API specification's accepted scenario,
//! 2. selects the monitor link,
//! 3. finds the scenario describing the monitor resource,
//! 4. polls it with exponential backoff until the envelope carries a
//!    completed response, then matches that response against the original
//!    scenario.
//!
//! Every way this can fail is a [`MonitorError`] variant; nothing escapes as
//! a panic.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};
use vouch_core::{HttpRequest, HttpResponse, Value};
use vouch_eval::{AssertFailure, FailureKind, ValidationResult};

use crate::config::RunnerConfig;
use crate::engine::{Scenario, SpecificationEngine};
use crate::executor::{Executor, TransportError};
use crate::link::monitor_link;

pub const ACCEPTED: u16 = 202;

// ──────────────────────────────────────────────
// Sleeper
// ──────────────────────────────────────────────

/// Suspends the current scenario between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("no accepted (202) scenario for {method} {path}")]
    NoProcessingScenario { method: String, path: String },

    #[error("accepted response does not match the specification")]
    AcceptedMismatch { result: ValidationResult },

    #[error("no Link header entry titled \"monitor\"")]
    NoMonitorLink,

    #[error("no scenario matches monitor link {url}")]
    NoMonitorScenario { url: String },

    #[error("response from monitor {url} does not match the monitor scenario")]
    MonitorShapeMismatch { url: String, result: ValidationResult },

    #[error("completed exchange reported by monitor {url} does not match the scenario")]
    MonitorMismatch { url: String, result: ValidationResult },

    #[error("monitor {url} did not report completion after {attempts} attempts")]
    MaxRetriesExceeded { url: String, attempts: u32 },

    #[error("could not decode the envelope from monitor {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("polling monitor {url} failed: {source}")]
    Poll {
        url: String,
        #[source]
        source: TransportError,
    },
}

impl MonitorError {
    /// Errors that mean no judgement could be made, as opposed to a
    /// validation failure.
    pub fn is_error(&self) -> bool {
        matches!(self, MonitorError::Poll { .. } | MonitorError::Decode { .. })
    }

    /// The failures to report for this error.
    pub fn into_failures(self) -> Vec<AssertFailure> {
        match self {
            MonitorError::AcceptedMismatch { result }
            | MonitorError::MonitorShapeMismatch { result, .. }
            | MonitorError::MonitorMismatch { result, .. } => result.into_failures(),
            other => vec![AssertFailure::new(
                "",
                FailureKind::Monitor,
                other.to_string(),
            )],
        }
    }
}

// ──────────────────────────────────────────────
// Monitor
// ──────────────────────────────────────────────

/// The completed exchange recovered from a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredExchange {
    pub request: HttpRequest,
    pub response: HttpResponse,
    /// The final raw monitor response.
    pub envelope: HttpResponse,
    /// Number of polls made.
    pub attempts: u32,
}

pub struct CompletionMonitor<'a> {
    engine: &'a dyn SpecificationEngine,
    executor: &'a dyn Executor,
    sleeper: &'a dyn Sleeper,
    config: &'a RunnerConfig,
}

impl<'a> CompletionMonitor<'a> {
    pub fn new(
        engine: &'a dyn SpecificationEngine,
        executor: &'a dyn Executor,
        sleeper: &'a dyn Sleeper,
        config: &'a RunnerConfig,
    ) -> Self {
        CompletionMonitor {
            engine,
            executor,
            sleeper,
            config,
        }
    }

    /// A 202 that carries a monitor link.
    pub fn is_applicable(response: &HttpResponse) -> bool {
        response.status == ACCEPTED && response.header("link").and_then(monitor_link).is_some()
    }

    pub async fn wait_for_response(
        &self,
        scenario: &Scenario,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> Result<MonitoredExchange, MonitorError> {
        let path = request.path_only();
        let accepted = self
            .engine
            .find_scenario(path, &request.method, ACCEPTED)
            .ok_or_else(|| MonitorError::NoProcessingScenario {
                method: request.method.clone(),
                path: path.to_string(),
            })?;
        let result = self.engine.match_response(&accepted, request, response);
        if !result.is_success() {
            return Err(MonitorError::AcceptedMismatch { result });
        }

        let link = response
            .header("link")
            .and_then(monitor_link)
            .ok_or(MonitorError::NoMonitorLink)?;
        let url = link.url;
        let monitor_scenario = self
            .engine
            .find_scenario(path_of(&url), "GET", 200)
            .ok_or_else(|| MonitorError::NoMonitorScenario { url: url.clone() })?;
        debug!(%url, scenario = %monitor_scenario.name, "monitoring deferred response");

        let poll = HttpRequest::new("GET", url.clone());
        for attempt in 0..self.config.max_retry {
            let delay = self.config.delay_before(attempt);
            if !delay.is_zero() {
                self.sleeper.sleep(delay).await;
            }

            let envelope = self
                .executor
                .execute(&poll)
                .await
                .map_err(|source| MonitorError::Poll {
                    url: url.clone(),
                    source,
                })?;
            let result = self.engine.match_response(&monitor_scenario, &poll, &envelope);
            if !result.is_success() {
                return Err(MonitorError::MonitorShapeMismatch {
                    url: url.clone(),
                    result,
                });
            }

            let decoded = decode_envelope(&url, &envelope.body, request)?;
            let Some((original_request, original_response)) = decoded else {
                warn!(%url, attempt = attempt + 1, "operation not complete yet");
                continue;
            };

            let result = self
                .engine
                .match_response(scenario, &original_request, &original_response);
            if !result.is_success() {
                return Err(MonitorError::MonitorMismatch { url, result });
            }
            info!(
                %url,
                attempts = attempt + 1,
                status = original_response.status,
                "deferred operation completed"
            );
            return Ok(MonitoredExchange {
                request: original_request,
                response: original_response,
                envelope,
                attempts: attempt + 1,
            });
        }

        Err(MonitorError::MaxRetriesExceeded {
            url,
            attempts: self.config.max_retry,
        })
    }
}

/// Path part of a link URL, without scheme, host or query.
fn path_of(url: &str) -> &str {
    let without_origin = match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |at| &rest[at..]),
        None => url,
    };
    without_origin.split('?').next().unwrap_or(without_origin)
}

/// `Ok(None)` while the envelope's `response` has no status code yet.
fn decode_envelope(
    url: &str,
    body: &Value,
    original: &HttpRequest,
) -> Result<Option<(HttpRequest, HttpResponse)>, MonitorError> {
    let decode_failed = |reason: String| MonitorError::Decode {
        url: url.to_string(),
        reason,
    };

    let Some(response) = body.get("response").filter(|r| is_complete(r)) else {
        return Ok(None);
    };
    let response: HttpResponse = serde_json::from_value(response.to_json())
        .map_err(|e| decode_failed(format!("response: {}", e)))?;
    let request = match body.get("request") {
        Some(request) if !request.is_null() => serde_json::from_value(request.to_json())
            .map_err(|e| decode_failed(format!("request: {}", e)))?,
        _ => original.clone(),
    };
    Ok(Some((request, response)))
}

fn is_complete(response: &Value) -> bool {
    ["statusCode", "status"]
        .iter()
        .any(|key| response.get(key).is_some_and(|status| !status.is_null()))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_paths() {
        assert_eq!(path_of("/monitor/1"), "/monitor/1");
        assert_eq!(path_of("http://host:8080/monitor/1?x=1"), "/monitor/1");
        assert_eq!(path_of("https://host"), "/");
    }

    #[test]
    fn incomplete_envelopes() {
        let original = HttpRequest::new("POST", "/products");
        for body in [json!({}), json!({"response": {}}), json!({"response": {"statusCode": null}})] {
            assert_eq!(
                decode_envelope("/m", &Value::from(body), &original).unwrap(),
                None
            );
        }
    }

    #[test]
    fn complete_envelope_decodes_both_sides() {
        let original = HttpRequest::new("POST", "/products");
        let body = Value::from(json!({
            "request": {"method": "POST", "path": "/products", "body": {"name": "Soap"}},
            "response": {"statusCode": 201, "body": {"id": 7}}
        }));
        let (request, response) = decode_envelope("/m", &body, &original).unwrap().unwrap();
        assert_eq!(request.body, Value::from(json!({"name": "Soap"})));
        assert_eq!(response.status, 201);
        assert_eq!(response.body, Value::from(json!({"id": 7})));
    }

    #[test]
    fn missing_request_falls_back_to_the_original() {
        let original = HttpRequest::new("POST", "/products");
        let body = Value::from(json!({"response": {"status": 201}}));
        let (request, _) = decode_envelope("/m", &body, &original).unwrap().unwrap();
        assert_eq!(request, original);
    }

    #[test]
    fn malformed_response_is_a_decode_error() {
        let original = HttpRequest::new("POST", "/products");
        let body = Value::from(json!({"response": {"statusCode": "soon"}}));
        assert!(matches!(
            decode_envelope("/m", &body, &original),
            Err(MonitorError::Decode { .. })
        ));
    }

    #[test]
    fn applicability_needs_status_and_link() {
        let link = r#"</monitor/1>; rel=related; title=monitor"#;
        assert!(CompletionMonitor::is_applicable(
            &HttpResponse::new(202).with_header("Link", link)
        ));
        assert!(!CompletionMonitor::is_applicable(
            &HttpResponse::new(201).with_header("Link", link)
        ));
        assert!(!CompletionMonitor::is_applicable(&HttpResponse::new(202)));
    }

    #[test]
    fn monitor_errors_become_failures() {
        let failures = MonitorError::MaxRetriesExceeded {
            url: "/monitor/1".to_string(),
            attempts: 3,
        }
        .into_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::Monitor);
        assert!(failures[0].message.contains("/monitor/1"));
    }
}
