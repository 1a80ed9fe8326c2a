use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use relay_core::value;
use relay_core::{Map, Value};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::BackendRegistry;
use crate::orchestrator::cancel::select_victims;
use crate::orchestrator::concurrency::ConcurrencyLimits;
use crate::orchestrator::events::{Event, EventSink};
use crate::orchestrator::handle::CallHandle;
use crate::orchestrator::plan::{CallGraph, LogicalRequest};
use crate::orchestrator::result::{CallReport, OrchestratorError, RequestOutcome};
use crate::orchestrator::transport::{Transport, TransportError};
use crate::orchestrator::types::{select_mode, CallState, DispatchMode, OrchestratorConfig};
use crate::orchestrator::worker::{run_call, CallResult, CallTask};
use crate::policy::{CallController, ResponseError, WireResponse};

/// Key under which completed outputs are visible to chained successors.
pub const RESPONSES_KEY: &str = "responses";

/// Drives the backend calls of logical requests.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<BackendRegistry>,
    transport: Arc<dyn Transport>,
    limits: Arc<ConcurrencyLimits>,
    event_sink: Arc<dyn EventSink>,
}

/// State of one logical request. Only the orchestrator loop touches it.
struct RequestRun {
    id: Uuid,
    context: Value,
    cancel_order: Option<String>,
    graph: CallGraph,
    handles: BTreeMap<String, CallHandle>,
    tasks: JoinSet<CallResult>,
    aggregate: Map,
    skipped: Vec<String>,
    diagnostics: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<BackendRegistry>,
        transport: Arc<dyn Transport>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        let limits = Arc::new(ConcurrencyLimits::new(config.global_concurrency, &registry));
        Self {
            config,
            registry,
            transport,
            limits,
            event_sink,
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub async fn execute(&self, request: LogicalRequest) -> Result<RequestOutcome, OrchestratorError> {
        self.execute_with_cancel(request, std::future::pending()).await
    }

    /// Like [`execute`](Self::execute), but every non-terminal call is cancelled once
    /// `cancel` resolves. The outcome still reports every call.
    pub async fn execute_with_cancel<C>(
        &self,
        request: LogicalRequest,
        cancel: C,
    ) -> Result<RequestOutcome, OrchestratorError>
    where
        C: Future<Output = ()>,
    {
        let graph = CallGraph::build(&request, &self.registry)?;
        let started_at = Utc::now();
        let mut run = RequestRun {
            id: request.id,
            context: request.context,
            cancel_order: request.cancel_order,
            graph,
            handles: BTreeMap::new(),
            tasks: JoinSet::new(),
            aggregate: Map::new(),
            skipped: Vec::new(),
            diagnostics: Vec::new(),
        };

        self.event_sink
            .emit(Event::RequestStarted {
                request_id: run.id,
                calls: request.calls.len(),
            })
            .await;

        for root in run.graph.roots().to_vec() {
            let ambient = run.context.clone();
            self.admit(&mut run, &root, None, ambient).await;
        }

        tokio::pin!(cancel);
        let mut cancel_armed = true;
        loop {
            tokio::select! {
                _ = &mut cancel, if cancel_armed => {
                    cancel_armed = false;
                    self.cancel_all(&mut run).await;
                }
                joined = run.tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((call_id, result))) => self.on_completion(&mut run, &call_id, result).await,
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => warn!(request_id = %run.id, error = %e, "call task panicked"),
                },
            }
        }

        // A task that panicked never reported back.
        let stranded: Vec<String> = run
            .handles
            .values()
            .filter(|h| !h.is_terminal())
            .map(|h| h.id.clone())
            .collect();
        for id in stranded {
            self.fail_call(&mut run, &id, "call task ended without a result".to_string())
                .await;
        }

        Ok(self.finish(run, started_at).await)
    }

    /// Build the call's wire request and dispatch it with the mode its plan selects.
    async fn admit(&self, run: &mut RequestRun, id: &str, parent: Option<String>, ambient: Value) {
        let Some(planned) = run.graph.get(id).cloned() else {
            return;
        };
        let Some(backend) = self.registry.get(&planned.backend).cloned() else {
            return;
        };

        let mut handle = CallHandle::new(
            planned.id.clone(),
            backend.clone(),
            planned.service.clone(),
            planned.priority,
            planned.parent.clone().or(parent),
            planned.next.clone(),
            run.graph.is_registered(&planned.id),
            CallController::new(planned.id.clone(), planned.service.clone(), ambient),
        );

        let built = match backend.service(&planned.service) {
            Some(service) => service
                .request_policy()
                .run(&mut handle.controller)
                .map_err(|e| e.to_string()),
            None => Err(format!("unknown service {}", planned.service)),
        };
        if let Err(e) = built {
            run.handles.insert(planned.id.clone(), handle);
            self.fail_call(run, &planned.id, e).await;
            self.skip_chain(run, &planned.id).await;
            return;
        }

        let (mode, diagnostic) = select_mode(
            !run.graph.has_registered(),
            planned.next.is_some(),
            run.cancel_order.as_deref(),
        );
        if let Some(diagnostic) = diagnostic {
            warn!(request_id = %run.id, call_id = %planned.id, "{diagnostic}");
            run.diagnostics
                .push(format!("call {}: {}", planned.id, diagnostic));
        }

        let channel = backend.channel();
        let task = CallTask {
            call_id: planned.id.clone(),
            backend: planned.backend.clone(),
            request: handle.controller.request().clone(),
            timeout: channel
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(self.config.call_timeout),
            max_response_bytes: channel
                .max_response_bytes
                .unwrap_or(self.config.max_response_bytes),
            transport: self.transport.clone(),
            limits: self.limits.clone(),
        };
        let abort = run.tasks.spawn(run_call(task));
        handle.mark_dispatched(mode, abort);
        run.handles.insert(planned.id.clone(), handle);

        debug!(request_id = %run.id, call_id = %planned.id, ?mode, "dispatched call");
        self.event_sink
            .emit(Event::CallDispatched {
                request_id: run.id,
                call_id: planned.id.clone(),
                mode,
            })
            .await;
    }

    async fn on_completion(
        &self,
        run: &mut RequestRun,
        call_id: &str,
        result: Result<WireResponse, TransportError>,
    ) {
        let Some(handle) = run.handles.get_mut(call_id) else {
            return;
        };
        if handle.state != CallState::Dispatched {
            // Cancelled before the reply arrived; the reply is dropped.
            debug!(request_id = %run.id, call_id, state = handle.state.as_str(), "ignoring late completion");
            return;
        }

        let parsed = match result {
            Ok(response) if !response.is_success() => {
                let error = format!("backend replied with status {}", response.status);
                self.fail_call(run, call_id, error).await;
                self.after_resolution(run, call_id).await;
                return;
            }
            Ok(response) => {
                handle.controller.set_response(response);
                match handle.backend.service(&handle.service) {
                    Some(service) => service.response_policy().run(&mut handle.controller),
                    None => Err(ResponseError::NoResponse),
                }
            }
            Err(e) => {
                let error = format!("transport: {e}");
                self.fail_call(run, call_id, error).await;
                self.after_resolution(run, call_id).await;
                return;
            }
        };

        match parsed {
            Ok(()) => {
                let output = handle.controller.take_output().unwrap_or(Value::Null);
                handle.complete();
                run.aggregate.insert(call_id.to_string(), output);
                info!(request_id = %run.id, call_id, "call completed");
                self.event_sink
                    .emit(Event::CallCompleted {
                        request_id: run.id,
                        call_id: call_id.to_string(),
                    })
                    .await;
            }
            Err(e) => {
                if matches!(e, ResponseError::MissingOutput) {
                    warn!(request_id = %run.id, call_id, "call produced no output");
                }
                self.fail_call(run, call_id, e.to_string()).await;
            }
        }

        self.after_resolution(run, call_id).await;
    }

    /// Post-actions of the completion handler the call was dispatched with.
    async fn after_resolution(&self, run: &mut RequestRun, call_id: &str) {
        let Some(handle) = run.handles.get(call_id) else {
            return;
        };
        let mode = handle.mode;
        let completed = handle.state == CallState::Completed;
        let next = handle.next.clone();
        match mode {
            Some(DispatchMode::Chained) => {
                match next {
                    Some(next) if completed => {
                        let mut ambient = run.context.clone();
                        value::merge_into(
                            &mut ambient,
                            RESPONSES_KEY,
                            &Value::Object(run.aggregate.clone()),
                        );
                        info!(request_id = %run.id, call_id, next = %next, "chaining call");
                        self.admit(run, &next, Some(call_id.to_string()), ambient).await;
                    }
                    _ => self.skip_chain(run, call_id).await,
                }
            }
            Some(DispatchMode::Grouped(order)) => {
                let victims = select_victims(order, call_id, &run.handles);
                for victim in victims {
                    let reason = format!("{order:?} cancellation after {call_id} resolved");
                    self.cancel_call(run, &victim, reason).await;
                }
            }
            // No post-actions, so a `next` link is never followed.
            Some(DispatchMode::FireAndForget) => self.skip_chain(run, call_id).await,
            None => {}
        }
    }

    async fn cancel_all(&self, run: &mut RequestRun) {
        let ids: Vec<String> = run
            .handles
            .values()
            .filter(|h| !h.is_terminal())
            .map(|h| h.id.clone())
            .collect();
        info!(request_id = %run.id, calls = ids.len(), "cancelling logical request");
        for id in ids {
            self.cancel_call(run, &id, "logical request cancelled".to_string())
                .await;
        }
    }

    async fn cancel_call(&self, run: &mut RequestRun, call_id: &str, reason: String) {
        let Some(handle) = run.handles.get_mut(call_id) else {
            return;
        };
        if !handle.cancel(reason.clone()) {
            return;
        }
        info!(request_id = %run.id, call_id, reason = %reason, "call cancelled");
        self.event_sink
            .emit(Event::CallCancelled {
                request_id: run.id,
                call_id: call_id.to_string(),
                reason,
            })
            .await;
        self.skip_chain(run, call_id).await;
    }

    async fn fail_call(&self, run: &mut RequestRun, call_id: &str, error: String) {
        let Some(handle) = run.handles.get_mut(call_id) else {
            return;
        };
        warn!(request_id = %run.id, call_id, error = %error, "call failed");
        handle.fail(error.clone());
        self.event_sink
            .emit(Event::CallFailed {
                request_id: run.id,
                call_id: call_id.to_string(),
                error,
            })
            .await;
    }

    /// Successors of `call_id` that will never be constructed.
    async fn skip_chain(&self, run: &mut RequestRun, call_id: &str) {
        for id in run.graph.chain_after(call_id) {
            if run.handles.contains_key(&id) || run.skipped.contains(&id) {
                continue;
            }
            debug!(request_id = %run.id, call_id = %id, "skipping chained call");
            self.event_sink
                .emit(Event::CallSkipped {
                    request_id: run.id,
                    call_id: id.clone(),
                })
                .await;
            run.skipped.push(id);
        }
    }

    async fn finish(&self, run: RequestRun, started_at: chrono::DateTime<Utc>) -> RequestOutcome {
        let calls: Vec<CallReport> = run
            .handles
            .values()
            .map(|h| CallReport {
                call_id: h.id.clone(),
                backend: h.backend.name().to_string(),
                service: h.service.clone(),
                state: h.state,
                mode: h.mode,
                error: h.error.clone(),
            })
            .collect();

        let outcome = RequestOutcome {
            request_id: run.id,
            response: Value::Object(run.aggregate),
            calls,
            skipped: run.skipped,
            diagnostics: run.diagnostics,
            started_at,
            finished_at: Utc::now(),
        };

        self.event_sink
            .emit(Event::RequestFinished {
                request_id: outcome.request_id,
                completed: outcome.count(CallState::Completed),
                failed: outcome.count(CallState::Failed),
                cancelled: outcome.count(CallState::Cancelled),
            })
            .await;
        outcome
    }
}
