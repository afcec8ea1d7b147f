//! Scenario results.

use serde::Serialize;
use vouch_core::HttpResponse;
use vouch_eval::{AssertFailure, ValidationResult};

/// The verdict of one scenario run.
///
/// `Failure` means a response arrived and did not match; `Error` means the
/// run could not reach a verdict (transport, resolution or store errors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioResult {
    Success,
    Failure { failures: Vec<AssertFailure> },
    Error { message: String },
}

impl ScenarioResult {
    pub fn from_validation(result: ValidationResult) -> Self {
        if result.is_success() {
            ScenarioResult::Success
        } else {
            ScenarioResult::Failure {
                failures: result.into_failures(),
            }
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ScenarioResult::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScenarioResult::Success)
    }

    /// Human-readable rendering.
    pub fn report(&self) -> String {
        match self {
            ScenarioResult::Success => "success".to_string(),
            ScenarioResult::Failure { failures } => {
                ValidationResult::from_failures(failures.clone()).report()
            }
            ScenarioResult::Error { message } => format!("error: {}", message),
        }
    }
}

/// A scenario's result together with the responses it was judged on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub result: ScenarioResult,
    /// The raw response, when the request got that far.
    pub response: Option<HttpResponse>,
    /// The response recovered through the completion monitor, if one ran.
    pub monitored_response: Option<HttpResponse>,
}

impl ScenarioOutcome {
    pub fn new(scenario: impl Into<String>, result: ScenarioResult) -> Self {
        ScenarioOutcome {
            scenario: scenario.into(),
            result,
            response: None,
            monitored_response: None,
        }
    }

    pub fn with_response(mut self, response: HttpResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_monitored_response(mut self, response: Option<HttpResponse>) -> Self {
        self.monitored_response = response;
        self
    }

    /// The response later stages judged: monitored when present, else raw.
    pub fn final_response(&self) -> Option<&HttpResponse> {
        self.monitored_response.as_ref().or(self.response.as_ref())
    }
}
