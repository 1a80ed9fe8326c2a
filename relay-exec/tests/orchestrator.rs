use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{parse_gateway_str, DocumentFormat};
use relay_exec::orchestrator::{Event, EventSink, NoOpEventSink};
use relay_exec::{
    BackendRegistry, CallState, CancelOrder, DispatchMode, LogicalRequest, Orchestrator,
    OrchestratorConfig, OrchestratorError, PlannedCall, Transport, TransportError, WireRequest,
    WireResponse,
};
use serde_json::json;

type Route = (Duration, Result<WireResponse, TransportError>);

#[derive(Default)]
struct MockTransport {
    routes: HashMap<String, Route>,
    sent: Mutex<Vec<WireRequest>>,
}

impl MockTransport {
    fn route(mut self, uri: &str, delay_ms: u64, body: serde_json::Value) -> Self {
        let response = WireResponse::new(200, "application/json", body.to_string());
        self.routes
            .insert(uri.to_string(), (Duration::from_millis(delay_ms), Ok(response)));
        self
    }

    fn status(mut self, uri: &str, delay_ms: u64, status: u16, body: serde_json::Value) -> Self {
        let response = WireResponse::new(status, "application/json", body.to_string());
        self.routes
            .insert(uri.to_string(), (Duration::from_millis(delay_ms), Ok(response)));
        self
    }

    fn fail(mut self, uri: &str, delay_ms: u64, err: TransportError) -> Self {
        self.routes
            .insert(uri.to_string(), (Duration::from_millis(delay_ms), Err(err)));
        self
    }

    fn sent_uris(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|r| r.uri.clone()).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        req: WireRequest,
        _timeout: Duration,
        _max_response_bytes: usize,
    ) -> Result<WireResponse, TransportError> {
        let route = self.routes.get(&req.uri).cloned();
        self.sent.lock().unwrap().push(req);
        match route {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Err(TransportError::Other("no route".into())),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    fn cancelled(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::CallCancelled { call_id, .. } => Some(call_id.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

const GATEWAY: &str = r#"
backends:
  - name: search
    request_templates:
      - name: base
        statements:
          - { name: host_ip_port, value: "127.0.0.1:9000" }
          - { name: http_method, value: get }
    response_templates:
      - name: passthrough
        statements:
          - { name: output, value: $response }
    services:
      - name: web
        request: { include: base, statements: [ { name: http_uri, value: /web } ] }
        response: { include: passthrough }
      - name: news
        request: { include: base, statements: [ { name: http_uri, value: /news } ] }
        response: { include: passthrough }
      - name: images
        request: { include: base, statements: [ { name: http_uri, value: /images } ] }
        response: { include: passthrough }
      - name: detail
        request:
          include: base
          statements:
            - { name: http_uri, value: "/detail/{ $responses.web.id }" }
        response: { include: passthrough }
      - name: broken
        request:
          statements:
            - { name: host_ip_port, value: "127.0.0.1:9000" }
            - { name: http_method, value: get }
        response: { include: passthrough }
      - name: silent
        request: { include: base, statements: [ { name: http_uri, value: /silent } ] }
        response:
          statements:
            - { name: ignored, value: $response }
"#;

fn registry() -> Arc<BackendRegistry> {
    let parsed = parse_gateway_str(GATEWAY, DocumentFormat::Auto).unwrap();
    Arc::new(BackendRegistry::from_gateway(&parsed.document).unwrap())
}

fn orchestrator(transport: Arc<MockTransport>, sink: Arc<RecordingSink>) -> Orchestrator {
    Orchestrator::new(OrchestratorConfig::default(), registry(), transport, sink)
}

fn call(id: &str, service: &str) -> PlannedCall {
    PlannedCall::new(id, "search", service)
}

fn standard_transport() -> MockTransport {
    MockTransport::default()
        .route("/web", 10, json!({ "id": 42 }))
        .route("/news", 50, json!({ "n": 1 }))
        .route("/images", 100, json!({ "i": 1 }))
        .route("/detail/42", 10, json!({ "title": "answer" }))
        .route("/silent", 10, json!({ "x": 1 }))
}

#[tokio::test(start_paused = true)]
async fn fire_and_forget_calls_all_complete() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport.clone(), sink.clone());

    let request = LogicalRequest::new(
        json!({}),
        vec![call("w", "web"), call("n", "news"), call("i", "images")],
    );
    let outcome = orch.execute(request).await.unwrap();

    assert!(outcome.all_completed());
    assert_eq!(outcome.output("w"), Some(&json!({ "id": 42 })));
    assert_eq!(outcome.output("i"), Some(&json!({ "i": 1 })));
    for report in &outcome.calls {
        assert_eq!(report.mode, Some(DispatchMode::FireAndForget));
    }
    assert!(sink.cancelled().is_empty());
    assert_eq!(transport.sent_uris().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn all_order_cancels_each_sibling_once() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport, sink.clone());

    let request = LogicalRequest::new(
        json!({}),
        vec![call("w", "web"), call("n", "news"), call("i", "images")],
    )
    .with_cancel_order("ALL")
    .with_registered(["w", "n", "i"]);
    let outcome = orch.execute(request).await.unwrap();

    assert_eq!(outcome.call("w").unwrap().state, CallState::Completed);
    assert_eq!(outcome.call("n").unwrap().state, CallState::Cancelled);
    assert_eq!(outcome.call("i").unwrap().state, CallState::Cancelled);
    assert_eq!(
        outcome.call("w").unwrap().mode,
        Some(DispatchMode::Grouped(CancelOrder::All))
    );
    assert!(outcome.output("n").is_none());

    let mut cancelled = sink.cancelled();
    cancelled.sort();
    assert_eq!(cancelled, vec!["i".to_string(), "n".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn priority_order_cancels_only_lower_priority_siblings() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport, sink.clone());

    let request = LogicalRequest::new(
        json!({}),
        vec![
            call("w", "web").with_priority(5),
            call("n", "news").with_priority(9),
            call("i", "images").with_priority(1),
        ],
    )
    .with_cancel_order("PRIORITY")
    .with_registered(["w", "n", "i"]);
    let outcome = orch.execute(request).await.unwrap();

    assert_eq!(outcome.call("w").unwrap().state, CallState::Completed);
    assert_eq!(outcome.call("n").unwrap().state, CallState::Completed);
    assert_eq!(outcome.call("i").unwrap().state, CallState::Cancelled);
    assert_eq!(sink.cancelled(), vec!["i".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn hierarchy_order_cancels_descendants() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport, sink.clone());

    let request = LogicalRequest::new(
        json!({}),
        vec![
            call("w", "web"),
            call("n", "news").with_parent("w"),
            call("i", "images"),
        ],
    )
    .with_cancel_order("HIERACHY")
    .with_registered(["w", "n", "i"]);
    let outcome = orch.execute(request).await.unwrap();

    assert_eq!(outcome.call("n").unwrap().state, CallState::Cancelled);
    assert_eq!(outcome.call("i").unwrap().state, CallState::Completed);
    assert_eq!(sink.cancelled(), vec!["n".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unknown_cancel_order_is_diagnosed_and_ignored() {
    let transport = Arc::new(standard_transport());
    let orch = Orchestrator::new(
        OrchestratorConfig::default(),
        registry(),
        transport,
        Arc::new(NoOpEventSink),
    );

    let request = LogicalRequest::new(json!({}), vec![call("w", "web"), call("n", "news")])
        .with_cancel_order("BOGUS")
        .with_registered(["w", "n"]);
    let outcome = orch.execute(request).await.unwrap();

    assert!(outcome.all_completed());
    assert_eq!(outcome.diagnostics.len(), 2);
    assert!(outcome.diagnostics[0].contains("BOGUS"));
}

#[tokio::test(start_paused = true)]
async fn chained_successor_sees_predecessor_output() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport.clone(), sink);

    let request = LogicalRequest::new(
        json!({}),
        vec![call("web", "web").with_next("d"), call("d", "detail")],
    )
    .with_registered(["web"]);
    let outcome = orch.execute(request).await.unwrap();

    assert!(outcome.all_completed());
    assert_eq!(outcome.call("web").unwrap().mode, Some(DispatchMode::Chained));
    assert_eq!(outcome.output("d"), Some(&json!({ "title": "answer" })));
    assert_eq!(transport.sent_uris(), vec!["/web", "/detail/42"]);
}

#[tokio::test(start_paused = true)]
async fn failed_predecessor_skips_its_chain() {
    let transport = Arc::new(
        standard_transport().fail("/web", 10, TransportError::Network("refused".into())),
    );
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport.clone(), sink);

    let request = LogicalRequest::new(
        json!({}),
        vec![call("web", "web").with_next("d"), call("d", "detail")],
    )
    .with_registered(["web"]);
    let outcome = orch.execute(request).await.unwrap();

    let web = outcome.call("web").unwrap();
    assert_eq!(web.state, CallState::Failed);
    assert!(web.error.as_deref().unwrap().contains("refused"));
    assert_eq!(outcome.skipped, vec!["d".to_string()]);
    assert!(outcome.call("d").is_none());
    assert_eq!(transport.sent_uris(), vec!["/web"]);
}

#[tokio::test(start_paused = true)]
async fn build_failure_is_never_dispatched() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport.clone(), sink);

    let request = LogicalRequest::new(json!({}), vec![call("b", "broken"), call("w", "web")]);
    let outcome = orch.execute(request).await.unwrap();

    let broken = outcome.call("b").unwrap();
    assert_eq!(broken.state, CallState::Failed);
    assert!(broken.mode.is_none());
    assert!(broken.error.as_deref().unwrap().contains("http_uri"));
    assert_eq!(outcome.call("w").unwrap().state, CallState::Completed);
    assert_eq!(transport.sent_uris(), vec!["/web"]);
}

#[tokio::test(start_paused = true)]
async fn missing_output_still_terminates_the_call() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport, sink);

    let request = LogicalRequest::new(json!({}), vec![call("s", "silent")]);
    let outcome = orch.execute(request).await.unwrap();

    assert_eq!(outcome.call("s").unwrap().state, CallState::Failed);
    assert!(outcome.output("s").is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_calls_time_out() {
    let transport = Arc::new(MockTransport::default().route("/web", 5_000, json!({})));
    let config = OrchestratorConfig {
        call_timeout: Duration::from_millis(100),
        ..OrchestratorConfig::default()
    };
    let orch = Orchestrator::new(config, registry(), transport, Arc::new(NoOpEventSink));

    let outcome = orch
        .execute(LogicalRequest::new(json!({}), vec![call("w", "web")]))
        .await
        .unwrap();
    let w = outcome.call("w").unwrap();
    assert_eq!(w.state, CallState::Failed);
    assert_eq!(w.error.as_deref(), Some("transport: timeout"));
}

#[tokio::test(start_paused = true)]
async fn external_cancellation_cancels_outstanding_calls() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport, sink.clone());

    let request = LogicalRequest::new(
        json!({}),
        vec![call("w", "web"), call("i", "images")],
    );
    let outcome = orch
        .execute_with_cancel(request, tokio::time::sleep(Duration::from_millis(30)))
        .await
        .unwrap();

    assert_eq!(outcome.call("w").unwrap().state, CallState::Completed);
    assert_eq!(outcome.call("i").unwrap().state, CallState::Cancelled);
    assert_eq!(sink.cancelled(), vec!["i".to_string()]);
}

#[tokio::test]
async fn invalid_plans_are_rejected_before_dispatch() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport.clone(), sink);

    let err = orch
        .execute(LogicalRequest::new(
            json!({}),
            vec![PlannedCall::new("x", "nowhere", "web")],
        ))
        .await
        .unwrap_err();
    assert_eq!(err, OrchestratorError::UnknownBackend("nowhere".into()));

    let err = orch
        .execute(LogicalRequest::new(
            json!({}),
            vec![call("a", "web").with_next("b"), call("b", "news").with_next("a")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidChain(_)));

    let err = orch
        .execute(LogicalRequest::new(
            json!({}),
            vec![call("a", "web"), call("a", "news")],
        ))
        .await
        .unwrap_err();
    assert_eq!(err, OrchestratorError::DuplicateCall("a".into()));
    assert!(transport.sent_uris().is_empty());
}

#[tokio::test(start_paused = true)]
async fn fire_and_forget_call_reports_its_dropped_successor() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport.clone(), sink.clone());

    let request = LogicalRequest::new(
        json!({}),
        vec![call("web", "web").with_next("d"), call("d", "detail")],
    );
    let outcome = orch.execute(request).await.unwrap();

    assert_eq!(outcome.call("web").unwrap().mode, Some(DispatchMode::FireAndForget));
    assert_eq!(outcome.call("web").unwrap().state, CallState::Completed);
    assert_eq!(outcome.skipped, vec!["d".to_string()]);
    assert!(!outcome.all_completed());
    assert_eq!(transport.sent_uris(), vec!["/web"]);

    let skipped_events = sink
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, Event::CallSkipped { call_id, .. } if call_id == "d"))
        .count();
    assert_eq!(skipped_events, 1);
}

#[tokio::test(start_paused = true)]
async fn non_success_status_fails_the_call_without_output() {
    let transport = Arc::new(standard_transport().status("/web", 10, 500, json!({ "error": "boom" })));
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport, sink);

    let request = LogicalRequest::new(json!({}), vec![call("w", "web"), call("n", "news")]);
    let outcome = orch.execute(request).await.unwrap();

    let w = outcome.call("w").unwrap();
    assert_eq!(w.state, CallState::Failed);
    assert!(w.error.as_deref().unwrap().contains("500"));
    assert!(outcome.output("w").is_none());
    assert_eq!(outcome.call("n").unwrap().state, CallState::Completed);
}

#[tokio::test(start_paused = true)]
async fn failed_chained_call_on_bad_status_skips_successor() {
    let transport = Arc::new(standard_transport().status("/web", 10, 503, json!({})));
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport.clone(), sink);

    let request = LogicalRequest::new(
        json!({}),
        vec![call("web", "web").with_next("d"), call("d", "detail")],
    )
    .with_registered(["web"]);
    let outcome = orch.execute(request).await.unwrap();

    assert_eq!(outcome.call("web").unwrap().state, CallState::Failed);
    assert_eq!(outcome.skipped, vec!["d".to_string()]);
    assert_eq!(transport.sent_uris(), vec!["/web"]);
}

#[tokio::test(start_paused = true)]
async fn call_outside_the_group_does_not_trigger_cancellation() {
    let transport = Arc::new(standard_transport());
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(transport, sink.clone());

    let request = LogicalRequest::new(
        json!({}),
        vec![call("w", "web"), call("n", "news"), call("i", "images")],
    )
    .with_cancel_order("ALL")
    .with_registered(["n", "i"]);
    let outcome = orch.execute(request).await.unwrap();

    // `w` resolves first but is not registered; `n` then cancels `i`.
    assert_eq!(outcome.call("w").unwrap().state, CallState::Completed);
    assert_eq!(outcome.call("n").unwrap().state, CallState::Completed);
    assert_eq!(outcome.call("i").unwrap().state, CallState::Cancelled);
    assert_eq!(sink.cancelled(), vec!["i".to_string()]);
}
