//! Scenario orchestration.
//!
//! One scenario runs strictly in sequence:
//!
//! generate request → resolve substitutions → execute → (monitor)? →
//! validate response → post-validation asserts → store entity.
//!
//! Errors before a response exists (generation, resolution, transport) end
//! the run as [`ScenarioResult::Error`]. Mismatches after that are
//! [`ScenarioResult::Failure`]. Only the completion monitor retries.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use vouch_core::{FactStore, HttpRequest, HttpResponse, Path, StoreDirective, Value};
use vouch_eval::{
    evaluate_all, parse_asserts, AssertFailure, FailureKind, LookupPolicy, Resolver,
    ValidationResult,
};

use crate::config::RunnerConfig;
use crate::context::TestRunContext;
use crate::engine::{Scenario, SpecificationEngine};
use crate::executor::Executor;
use crate::monitor::{CompletionMonitor, Sleeper, TokioSleeper};
use crate::outcome::{ScenarioOutcome, ScenarioResult};

/// Carries the scenario's expected status to the service under test.
pub const EXPECTED_STATUS_HEADER: &str = "X-Vouch-Response-Code";
/// A service sets this to `failure` to fail the scenario with its body.
pub const RESULT_HEADER: &str = "X-Vouch-Result";

pub struct Orchestrator<'a> {
    context: &'a TestRunContext,
    engine: &'a dyn SpecificationEngine,
    executor: &'a dyn Executor,
    sleeper: &'a dyn Sleeper,
    config: &'a RunnerConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        context: &'a TestRunContext,
        engine: &'a dyn SpecificationEngine,
        executor: &'a dyn Executor,
        config: &'a RunnerConfig,
    ) -> Self {
        Orchestrator {
            context,
            engine,
            executor,
            sleeper: &TokioSleeper,
            config,
        }
    }

    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run one scenario to a verdict.
    pub async fn run(&self, scenario: &Scenario) -> ScenarioOutcome {
        info!(scenario = %scenario.name, method = %scenario.method, path = %scenario.path, "running scenario");
        let outcome = self.run_steps(scenario).await;
        match &outcome.result {
            ScenarioResult::Success => info!(scenario = %scenario.name, "scenario passed"),
            ScenarioResult::Failure { failures } => {
                info!(scenario = %scenario.name, failures = failures.len(), "scenario failed")
            }
            ScenarioResult::Error { message } => {
                warn!(scenario = %scenario.name, %message, "scenario errored")
            }
        }
        outcome
    }

    async fn run_steps(&self, scenario: &Scenario) -> ScenarioOutcome {
        let name = scenario.name.as_str();
        let request = match self.prepare_request(scenario) {
            Ok(request) => request,
            Err(message) => return ScenarioOutcome::new(name, ScenarioResult::error(message)),
        };

        if let Some(state) = &scenario.server_state {
            if let Err(e) = self.executor.set_server_state(state).await {
                return ScenarioOutcome::new(name, ScenarioResult::error(e.to_string()));
            }
        }

        let response = match self.executor.execute(&request).await {
            Ok(response) => response,
            Err(e) => return ScenarioOutcome::new(name, ScenarioResult::error(e.to_string())),
        };
        debug!(scenario = name, status = response.status, "response received");
        let outcome = |result: ScenarioResult, monitored: Option<HttpResponse>| {
            ScenarioOutcome::new(name, result)
                .with_response(response.clone())
                .with_monitored_response(monitored)
        };

        if is_signalled_failure(&response) {
            let failure = AssertFailure::new(
                "",
                FailureKind::Signalled,
                response.body.string_form(),
            );
            return outcome(ScenarioResult::Failure { failures: vec![failure] }, None);
        }

        let mut validation = self.engine.match_response(scenario, &request, &response);
        let mut exchange = (request.clone(), response.clone());
        let mut monitored = None;
        if !validation.is_success() && CompletionMonitor::is_applicable(&response) {
            debug!(scenario = name, "response accepted for later completion");
            let monitor =
                CompletionMonitor::new(self.engine, self.executor, self.sleeper, self.config);
            match monitor.wait_for_response(scenario, &request, &response).await {
                Ok(done) => {
                    monitored = Some(done.response.clone());
                    exchange = (done.request, done.response);
                    validation = ValidationResult::success();
                }
                Err(e) if e.is_error() => {
                    return outcome(ScenarioResult::error(e.to_string()), None);
                }
                Err(e) => {
                    return outcome(
                        ScenarioResult::Failure {
                            failures: e.into_failures(),
                        },
                        None,
                    );
                }
            }
        }

        let (final_request, final_response) = exchange;
        validation.absorb(self.post_validate(scenario, &final_request, &final_response));
        if !validation.is_success() {
            return outcome(ScenarioResult::from_validation(validation), monitored);
        }

        if let Some(directive) = scenario
            .example
            .as_ref()
            .and_then(|example| StoreDirective::from_body(&example.response.body))
        {
            if let Err(e) = self.context.store_entity(directive, &final_response.body) {
                return outcome(ScenarioResult::error(e.to_string()), monitored);
            }
        }

        outcome(ScenarioResult::Success, monitored)
    }

    /// Generate, resolve and tag the request.
    fn prepare_request(&self, scenario: &Scenario) -> Result<HttpRequest, String> {
        let generated = self
            .engine
            .generate_request(scenario)
            .map_err(|e| e.to_string())?;
        let entity = self.context.entity_facts();
        let resolver = Resolver::new(self.context.config_facts(), &entity, LookupPolicy::Fail);
        let resolved = resolver
            .resolve_request(&generated)
            .map_err(|e| e.to_string())?;
        debug!(scenario = %scenario.name, path = %resolved.path, "request resolved");
        Ok(resolved.with_header(EXPECTED_STATUS_HEADER, scenario.status.to_string()))
    }

    /// Assertions declared in the example response, checked against the
    /// final exchange.
    fn post_validate(
        &self,
        scenario: &Scenario,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> ValidationResult {
        let Some(example) = &scenario.example else {
            return ValidationResult::success();
        };
        let mut asserts = parse_asserts(&Path::parse("RESPONSE.BODY"), &example.response.body);
        asserts.extend(parse_asserts(
            &Path::parse("RESPONSE.HEADERS"),
            &string_map(&example.response.headers),
        ));
        if asserts.is_empty() {
            return ValidationResult::success();
        }

        let expected: FactStore = self
            .context
            .config_facts()
            .merge(&self.context.entity_facts())
            .merge(&request.to_facts());
        let actual = response.to_facts();
        debug!(scenario = %scenario.name, asserts = asserts.len(), "post-validation");
        evaluate_all(&asserts, &expected, &actual, self.engine.patterns())
    }
}

fn is_signalled_failure(response: &HttpResponse) -> bool {
    response
        .header(RESULT_HEADER)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("failure"))
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::string(v)))
            .collect(),
    )
}
