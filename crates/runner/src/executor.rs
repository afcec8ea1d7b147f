//! Executor seam: whatever actually delivers requests to the service under
//! test.

use async_trait::async_trait;
use vouch_core::{HttpRequest, HttpResponse, Value};

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server state could not be applied: {0}")]
    ServerState(String),

    #[error("executor task failed: {0}")]
    Task(String),
}

/// Delivers requests. Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Apply a scenario's server-state precondition. The default ignores it.
    async fn set_server_state(&self, _state: &Value) -> Result<(), TransportError> {
        Ok(())
    }
}
