//! vouch-runner -- executes contract-test scenarios against a live service.
//!
//! Collaborators sit behind traits: [`SpecificationEngine`] knows the
//! scenarios and their shapes, [`Executor`] delivers requests. The
//! [`Orchestrator`] drives one scenario through request generation,
//! substitution, execution, optional completion monitoring, validation and
//! entity storage. [`run_suite`] runs an ordered list of scenarios.

pub mod config;
pub mod context;
pub mod engine;
pub mod executor;
pub mod http_executor;
pub mod link;
pub mod monitor;
pub mod orchestrator;
pub mod outcome;
pub mod static_engine;
pub mod suite;

pub use config::{ConfigError, ConfigStore, RunnerConfig};
pub use context::TestRunContext;
pub use engine::{EngineError, Example, Scenario, SpecificationEngine};
pub use executor::{Executor, TransportError};
pub use http_executor::HttpExecutor;
pub use link::{monitor_link, parse_links, Link};
pub use monitor::{CompletionMonitor, MonitorError, MonitoredExchange, Sleeper, TokioSleeper};
pub use orchestrator::{Orchestrator, EXPECTED_STATUS_HEADER, RESULT_HEADER};
pub use outcome::{ScenarioOutcome, ScenarioResult};
pub use static_engine::StaticEngine;
pub use suite::{run_suite, SuiteReport, SuiteSummary};
