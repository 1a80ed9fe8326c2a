use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::orchestrator::types::DispatchMode;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RequestStarted {
        request_id: Uuid,
        calls: usize,
    },
    RequestFinished {
        request_id: Uuid,
        completed: usize,
        failed: usize,
        cancelled: usize,
    },
    CallDispatched {
        request_id: Uuid,
        call_id: String,
        mode: DispatchMode,
    },
    CallCompleted {
        request_id: Uuid,
        call_id: String,
    },
    CallFailed {
        request_id: Uuid,
        call_id: String,
        error: String,
    },
    CallCancelled {
        request_id: Uuid,
        call_id: String,
        reason: String,
    },
    CallSkipped {
        request_id: Uuid,
        call_id: String,
    },
}

impl Event {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Event::RequestStarted { request_id, calls } => {
                json!({ "type": "request.started", "request_id": request_id.to_string(), "calls": calls })
            }
            Event::RequestFinished { request_id, completed, failed, cancelled } => {
                json!({ "type": "request.finished", "request_id": request_id.to_string(), "completed": completed, "failed": failed, "cancelled": cancelled })
            }
            Event::CallDispatched { request_id, call_id, mode } => {
                json!({ "type": "call.dispatched", "request_id": request_id.to_string(), "call_id": call_id, "dispatch": mode })
            }
            Event::CallCompleted { request_id, call_id } => {
                json!({ "type": "call.completed", "request_id": request_id.to_string(), "call_id": call_id })
            }
            Event::CallFailed { request_id, call_id, error } => {
                json!({ "type": "call.failed", "request_id": request_id.to_string(), "call_id": call_id, "error": error })
            }
            Event::CallCancelled { request_id, call_id, reason } => {
                json!({ "type": "call.cancelled", "request_id": request_id.to_string(), "call_id": call_id, "reason": reason })
            }
            Event::CallSkipped { request_id, call_id } => {
                json!({ "type": "call.skipped", "request_id": request_id.to_string(), "call_id": call_id })
            }
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// JSON lines on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
