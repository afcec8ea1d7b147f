//! Specification engine seam.
//!
//! The engine owns the scenarios of an API specification: it generates
//! requests for them, matches responses against their declared shapes and
//! finds scenarios by path, method and status. The orchestrator and the
//! completion monitor only talk to it through [`SpecificationEngine`].

use serde::Serialize;
use vouch_core::{HttpRequest, HttpResponse, Pattern, PatternRegistry, Value};
use vouch_eval::ValidationResult;

/// The declared example exchange of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

/// One request/response expectation of the specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub method: String,
    /// Path template; `{name}` segments match any single segment.
    pub path: String,
    pub status: u16,
    pub request_shape: Pattern,
    pub response_shape: Pattern,
    pub example: Option<Example>,
    /// Opaque precondition handed to the executor before the request runs.
    pub server_state: Option<Value>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, method: impl Into<String>, path: impl Into<String>, status: u16) -> Self {
        Scenario {
            name: name.into(),
            method: method.into(),
            path: path.into(),
            status,
            request_shape: Pattern::Any,
            response_shape: Pattern::Any,
            example: None,
            server_state: None,
        }
    }

    /// Attach a declared example. The structure of its bodies becomes the
    /// request and response shapes; the assertions it declares are checked
    /// after the shape.
    pub fn with_example(mut self, request: HttpRequest, response: HttpResponse) -> Self {
        self.request_shape = Pattern::skeleton(&request.body);
        self.response_shape = Pattern::skeleton(&response.body);
        self.example = Some(Example { request, response });
        self
    }

    pub fn with_response_shape(mut self, shape: Pattern) -> Self {
        self.response_shape = shape;
        self
    }

    pub fn with_server_state(mut self, state: Value) -> Self {
        self.server_state = Some(state);
        self
    }

    /// Does this scenario's path template match a concrete path?
    pub fn matches_path(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        let template: Vec<&str> = self.path.trim_matches('/').split('/').collect();
        let concrete: Vec<&str> = path.trim_matches('/').split('/').collect();
        template.len() == concrete.len()
            && template.iter().zip(&concrete).all(|(t, c)| {
                (t.starts_with('{') && t.ends_with('}') && !c.is_empty()) || t == c
            })
    }
}

/// Errors raised by a specification engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("cannot generate a request for scenario \"{scenario}\": {reason}")]
    CannotGenerate { scenario: String, reason: String },
}

/// The specification collaborator.
pub trait SpecificationEngine: Send + Sync {
    /// Produce a concrete (possibly still tokenised) request for `scenario`.
    fn generate_request(&self, scenario: &Scenario) -> Result<HttpRequest, EngineError>;

    /// Check `response` against the shape `scenario` declares.
    fn match_response(
        &self,
        scenario: &Scenario,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> ValidationResult;

    fn find_scenario(&self, path: &str, method: &str, status: u16) -> Option<Scenario>;

    /// Named patterns used by `PatternMatch` assertions.
    fn patterns(&self) -> &dyn PatternRegistry;
}
