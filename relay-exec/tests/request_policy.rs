use relay_core::{BlockConfig, ChannelConfig, Statement};
use relay_exec::policy::{BuildError, CallController, HttpMethod, RequestPolicy};
use relay_exec::Backend;
use serde_json::{json, Value};

fn block(statements: Value) -> BlockConfig {
    let statements = statements
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| Statement::new(k.clone(), v.clone()))
        .collect();
    BlockConfig {
        include: None,
        statements,
    }
}

fn run(statements: Value, context: Value) -> (Result<(), BuildError>, CallController) {
    let backend = Backend::new("search", ChannelConfig::default());
    let policy = RequestPolicy::init(&block(statements), &backend).unwrap();
    let mut cntl = CallController::new("c1", "web", context);
    let res = policy.run(&mut cntl);
    (res, cntl)
}

#[test]
fn builds_get_request_from_context() {
    let (res, cntl) = run(
        json!({
            "host_ip_port": "10.0.0.1:8080",
            "http_method": "get",
            "http_uri": "/search/{ $user.id }",
            "http_query": { "q": "$query", "limit": 10, "absent": null },
            "http_header": { "X-Foo": 1, "X-Skip": null },
        }),
        json!({ "user": { "id": 7 }, "query": "rust" }),
    );
    res.unwrap();

    let req = cntl.request();
    assert_eq!(req.method, HttpMethod::Get);
    assert_eq!(req.endpoint.as_deref(), Some("10.0.0.1:8080"));
    assert_eq!(req.uri, "/search/7");
    assert_eq!(req.query_value("q"), Some("rust"));
    assert_eq!(req.query_value("limit"), Some("10"));
    assert_eq!(req.query_value("absent"), None);
    assert_eq!(req.header("X-Foo"), Some("1"));
    assert_eq!(req.header("X-Skip"), None);
    assert!(req.body.is_empty());
    assert_eq!(
        req.url().unwrap().as_str(),
        "http://10.0.0.1:8080/search/7?q=rust&limit=10"
    );
}

#[test]
fn only_lowercase_post_selects_post() {
    let base = |method: &str| {
        json!({
            "host_ip_port": "h:1",
            "http_method": method,
            "http_uri": "/",
        })
    };
    let (res, cntl) = run(base("post"), json!({}));
    res.unwrap();
    assert_eq!(cntl.request().method, HttpMethod::Post);

    for other in ["POST", "Post", "get", "put"] {
        let (res, cntl) = run(base(other), json!({}));
        res.unwrap();
        assert_eq!(cntl.request().method, HttpMethod::Get, "{other}");
    }
}

#[test]
fn rerunning_on_one_controller_rebuilds_from_scratch() {
    let backend = Backend::new("search", ChannelConfig::default());
    let policy = RequestPolicy::init(
        &block(json!({
            "host_ip_port": "h:1",
            "http_method": "post",
            "http_uri": "/items",
            "http_query": { "q": "$q" },
            "http_header": { "Content-Type": "application/json", "X-Foo": 1 },
            "http_body": { "a": 1 },
        })),
        &backend,
    )
    .unwrap();
    let mut cntl = CallController::new("c1", "web", json!({ "q": "rust" }));

    policy.run(&mut cntl).unwrap();
    let first = cntl.request().clone();
    policy.run(&mut cntl).unwrap();

    assert_eq!(cntl.request(), &first);
    assert_eq!(cntl.request().method, HttpMethod::Post);
    assert_eq!(cntl.request().query.len(), 1);
    assert_eq!(cntl.request().headers.len(), 1);
    assert_eq!(cntl.request().body, br#"{"a":1}"#.to_vec());
}

#[test]
fn content_type_header_moves_to_content_type_field() {
    let (res, cntl) = run(
        json!({
            "host_ip_port": "h:1",
            "http_method": "post",
            "http_uri": "/items",
            "http_header": { "Content-Type": "application/json; charset=utf-8" },
            "http_body": { "name": "$name", "tags": ["a", "b"] },
        }),
        json!({ "name": "widget" }),
    );
    res.unwrap();

    let req = cntl.request();
    assert_eq!(req.content_type, "application/json; charset=utf-8");
    assert_eq!(req.header("Content-Type"), None);
    let body: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(body, json!({ "name": "widget", "tags": ["a", "b"] }));
}

#[test]
fn json_body_is_encoded_verbatim() {
    let (res, cntl) = run(
        json!({
            "host_ip_port": "h:1",
            "http_method": "post",
            "http_uri": "/items",
            "http_header": { "Content-Type": "application/json" },
            "http_body": { "a": 1 },
        }),
        json!({}),
    );
    res.unwrap();
    assert_eq!(cntl.request().body, br#"{"a":1}"#.to_vec());
}

#[test]
fn non_json_content_type_drops_body() {
    let (res, cntl) = run(
        json!({
            "host_ip_port": "h:1",
            "http_method": "post",
            "http_uri": "/items",
            "http_header": { "Content-Type": "text/plain" },
            "http_body": "hello",
        }),
        json!({}),
    );
    res.unwrap();
    assert!(cntl.request().body.is_empty());

    let (res, cntl) = run(
        json!({
            "host_ip_port": "h:1",
            "http_method": "post",
            "http_uri": "/items",
            "http_body": "hello",
        }),
        json!({}),
    );
    res.unwrap();
    assert!(cntl.request().body.is_empty());
}

#[test]
fn missing_required_variables_fail_the_build() {
    for missing in ["http_uri", "http_method", "host_ip_port"] {
        let mut statements = json!({
            "host_ip_port": "h:1",
            "http_method": "get",
            "http_uri": "/",
        });
        statements.as_object_mut().unwrap().remove(missing);

        let (res, cntl) = run(statements, json!({}));
        assert_eq!(res.unwrap_err(), BuildError::MissingVariable(missing));
        assert!(cntl.request().endpoint.is_none(), "{missing}");
    }
}

#[test]
fn host_without_port_is_rejected() {
    let (res, _) = run(
        json!({
            "host_ip_port": "localhost",
            "http_method": "get",
            "http_uri": "/",
        }),
        json!({}),
    );
    assert_eq!(res.unwrap_err(), BuildError::MalformedHost("localhost".into()));

    let (res, _) = run(
        json!({
            "host_ip_port": 8080,
            "http_method": "get",
            "http_uri": "/",
        }),
        json!({}),
    );
    assert!(matches!(
        res.unwrap_err(),
        BuildError::InvalidType { variable: "host_ip_port", .. }
    ));
}

#[test]
fn undefined_reference_fails_the_build() {
    let (res, _) = run(
        json!({
            "host_ip_port": "h:1",
            "http_method": "get",
            "http_uri": "/u/{ $user.id }",
        }),
        json!({ "user": {} }),
    );
    match res.unwrap_err() {
        BuildError::Evaluation(e) => assert_eq!(e.statement, "http_uri"),
        other => panic!("unexpected error: {other}"),
    }
}
