use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Applies to every call whose backend channel sets no timeout.
    pub call_timeout: Duration,
    /// Max in-flight calls across all logical requests.
    pub global_concurrency: usize,
    pub max_response_bytes: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            global_concurrency: 64,
            max_response_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Pending,
    Dispatched,
    Completed,
    Failed,
    Cancelled,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Completed | CallState::Failed | CallState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Pending => "pending",
            CallState::Dispatched => "dispatched",
            CallState::Completed => "completed",
            CallState::Failed => "failed",
            CallState::Cancelled => "cancelled",
        }
    }
}

/// Named cancellation policy of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CancelOrder {
    All,
    Priority,
    Hierarchy,
}

impl CancelOrder {
    /// `None` for anything that is not a known order; callers treat that as NONE.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ALL" => Some(CancelOrder::All),
            "PRIORITY" => Some(CancelOrder::Priority),
            // HIERACHY is the spelling older planners emit.
            "HIERARCHY" | "HIERACHY" => Some(CancelOrder::Hierarchy),
            _ => None,
        }
    }
}

/// Which completion handler a dispatched call gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "order")]
pub enum DispatchMode {
    FireAndForget,
    Chained,
    Grouped(CancelOrder),
}

/// Dispatch mode for a call, plus a diagnostic when the cancel order was not usable.
///
/// Precedence: no registered call ids, then a `next` link, then the cancel order.
pub fn select_mode(
    registered_empty: bool,
    has_next: bool,
    cancel_order: Option<&str>,
) -> (DispatchMode, Option<String>) {
    if registered_empty {
        return (DispatchMode::FireAndForget, None);
    }
    if has_next {
        return (DispatchMode::Chained, None);
    }
    let token = cancel_order.unwrap_or_default();
    match CancelOrder::from_token(token) {
        Some(order) => (DispatchMode::Grouped(order), None),
        None => (
            DispatchMode::FireAndForget,
            Some(format!(
                "unrecognized cancel order [{token}], ignored as NONE"
            )),
        ),
    }
}
