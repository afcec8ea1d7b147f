//! Running an ordered list of scenarios.
//!
//! Order is the dependency chain: a scenario that stores an entity runs
//! before the scenarios that read it, so the suite never runs them
//! concurrently.

use serde::Serialize;
use tracing::info;

use crate::engine::Scenario;
use crate::orchestrator::Orchestrator;
use crate::outcome::{ScenarioOutcome, ScenarioResult};

/// Counts of each verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub success: usize,
    pub failure: usize,
    pub error: usize,
}

impl SuiteSummary {
    pub fn record(&mut self, result: &ScenarioResult) {
        match result {
            ScenarioResult::Success => self.success += 1,
            ScenarioResult::Failure { .. } => self.failure += 1,
            ScenarioResult::Error { .. } => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure + self.error
    }

    pub fn all_passed(&self) -> bool {
        self.failure == 0 && self.error == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub outcomes: Vec<ScenarioOutcome>,
    pub summary: SuiteSummary,
}

/// Run `scenarios` one after another, in order.
pub async fn run_suite(orchestrator: &Orchestrator<'_>, scenarios: &[Scenario]) -> SuiteReport {
    let mut summary = SuiteSummary::default();
    let mut outcomes = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let outcome = orchestrator.run(scenario).await;
        summary.record(&outcome.result);
        outcomes.push(outcome);
    }
    info!(
        success = summary.success,
        failure = summary.failure,
        error = summary.error,
        "suite finished"
    );
    SuiteReport { outcomes, summary }
}
