//! In-memory specification engine.
//!
//! Scenarios are declared up front. Requests come from each scenario's
//! example; responses are matched by status, then by the response shape.

use vouch_core::{HttpRequest, HttpResponse, Path, PatternRegistry, PatternTable};
use vouch_eval::{AssertFailure, FailureKind, ValidationResult};

use crate::engine::{EngineError, Scenario, SpecificationEngine};

#[derive(Debug, Clone, Default)]
pub struct StaticEngine {
    scenarios: Vec<Scenario>,
    patterns: PatternTable,
}

impl StaticEngine {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        StaticEngine {
            scenarios,
            patterns: PatternTable::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: PatternTable) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }
}

impl SpecificationEngine for StaticEngine {
    fn generate_request(&self, scenario: &Scenario) -> Result<HttpRequest, EngineError> {
        match &scenario.example {
            Some(example) => {
                let mut request = example.request.clone();
                if request.method.is_empty() {
                    request.method = scenario.method.clone();
                }
                if request.path.is_empty() {
                    request.path = scenario.path.clone();
                }
                Ok(request)
            }
            None if !scenario.path.contains('{') => {
                Ok(HttpRequest::new(scenario.method.clone(), scenario.path.clone()))
            }
            None => Err(EngineError::CannotGenerate {
                scenario: scenario.name.clone(),
                reason: format!("{} has path parameters and no example", scenario.path),
            }),
        }
    }

    fn match_response(
        &self,
        scenario: &Scenario,
        _request: &HttpRequest,
        response: &HttpResponse,
    ) -> ValidationResult {
        if response.status != scenario.status {
            return ValidationResult::failure(AssertFailure::new(
                "RESPONSE.STATUS",
                FailureKind::ShapeMismatch,
                format!(
                    "Expected status {}, actual was {}",
                    scenario.status, response.status
                ),
            ));
        }
        scenario
            .response_shape
            .matches(&response.body, &Path::parse("RESPONSE.BODY"), &self.patterns)
            .into_iter()
            .map(|mismatch| {
                ValidationResult::failure(AssertFailure::new(
                    mismatch.path.to_string(),
                    FailureKind::ShapeMismatch,
                    mismatch.message,
                ))
            })
            .collect()
    }

    fn find_scenario(&self, path: &str, method: &str, status: u16) -> Option<Scenario> {
        self.scenarios
            .iter()
            .find(|s| {
                s.status == status && s.method.eq_ignore_ascii_case(method) && s.matches_path(path)
            })
            .cloned()
    }

    fn patterns(&self) -> &dyn PatternRegistry {
        &self.patterns
    }
}
