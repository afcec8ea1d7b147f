//! Scripted collaborators shared by the runner integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vouch_core::{HttpRequest, HttpResponse, Value};
use vouch_runner::{Executor, Sleeper, TransportError};

/// Answers requests from a fixed queue and records what it was sent.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    states: Mutex<Vec<Value>>,
}

impl ScriptedExecutor {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        ScriptedExecutor {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<Value> {
        self.states.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Request {
                url: request.path.clone(),
                message: "connection refused".to_string(),
            })
    }

    async fn set_server_state(&self, state: &Value) -> Result<(), TransportError> {
        self.states.lock().unwrap().push(state.clone());
        Ok(())
    }
}

/// Records requested sleeps without waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn millis(&self) -> Vec<u128> {
        self.sleeps.lock().unwrap().iter().map(Duration::as_millis).collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
