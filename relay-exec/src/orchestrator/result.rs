use chrono::{DateTime, Utc};
use relay_core::Value;
use serde::Serialize;
use uuid::Uuid;

use crate::orchestrator::types::{CallState, DispatchMode};

/// What a logical request produced once every call reached a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub request_id: Uuid,
    /// Outputs of completed calls, keyed by call id.
    pub response: Value,
    pub calls: Vec<CallReport>,
    /// Chained successors never constructed because their predecessor did not complete.
    pub skipped: Vec<String>,
    pub diagnostics: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RequestOutcome {
    pub fn call(&self, id: &str) -> Option<&CallReport> {
        self.calls.iter().find(|c| c.call_id == id)
    }

    pub fn output(&self, id: &str) -> Option<&Value> {
        self.response.get(id)
    }

    pub fn count(&self, state: CallState) -> usize {
        self.calls.iter().filter(|c| c.state == state).count()
    }

    pub fn all_completed(&self) -> bool {
        self.skipped.is_empty() && self.calls.iter().all(|c| c.state == CallState::Completed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallReport {
    pub call_id: String,
    pub backend: String,
    pub service: String,
    pub state: CallState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DispatchMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Plan problems, detected before anything is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
    #[error("backend `{backend}` has no service `{service}`")]
    UnknownService { backend: String, service: String },
    #[error("duplicate call id: {0}")]
    DuplicateCall(String),
    #[error("call `{call}` links to unknown call `{target}`")]
    DanglingLink { call: String, target: String },
    #[error("invalid chain at call `{0}` (self link, shared successor or cycle)")]
    InvalidChain(String),
}
