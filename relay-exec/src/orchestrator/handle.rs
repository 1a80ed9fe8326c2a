use std::sync::Arc;

use tokio::task::AbortHandle;

use crate::backend::Backend;
use crate::orchestrator::types::{CallState, DispatchMode};
use crate::policy::CallController;

/// Orchestrator-side record of one backend call.
#[derive(Debug)]
pub struct CallHandle {
    pub id: String,
    pub backend: Arc<Backend>,
    pub service: String,
    pub priority: i32,
    pub parent: Option<String>,
    pub next: Option<String>,
    pub in_group: bool,
    pub mode: Option<DispatchMode>,
    pub state: CallState,
    pub error: Option<String>,
    pub controller: CallController,
    task: Option<AbortHandle>,
    cancel_decided: bool,
}

impl CallHandle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        backend: Arc<Backend>,
        service: String,
        priority: i32,
        parent: Option<String>,
        next: Option<String>,
        in_group: bool,
        controller: CallController,
    ) -> Self {
        Self {
            id,
            backend,
            service,
            priority,
            parent,
            next,
            in_group,
            mode: None,
            state: CallState::Pending,
            error: None,
            controller,
            task: None,
            cancel_decided: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn mark_dispatched(&mut self, mode: DispatchMode, task: AbortHandle) {
        self.mode = Some(mode);
        self.task = Some(task);
        self.state = CallState::Dispatched;
    }

    pub fn complete(&mut self) {
        self.state = CallState::Completed;
        self.task = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = CallState::Failed;
        self.error = Some(error.into());
        self.task = None;
    }

    /// Cancel a non-terminal call and abort its task. Returns `false` when the call is
    /// already terminal or was already the target of a cancellation decision.
    pub fn cancel(&mut self, reason: impl Into<String>) -> bool {
        if self.cancel_decided || self.is_terminal() {
            return false;
        }
        self.cancel_decided = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state = CallState::Cancelled;
        self.error = Some(reason.into());
        true
    }
}
