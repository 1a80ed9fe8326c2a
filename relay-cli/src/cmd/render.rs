use std::path::Path;

use relay_core::Value;
use relay_exec::{CallController, WireRequest};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

use super::config::{load_document, load_registry};

#[derive(Serialize)]
struct RenderResult<'a> {
    backend: &'a str,
    service: &'a str,
    target: String,
    request: &'a WireRequest,
}

pub async fn render_cmd(
    path: &Path,
    backend: &str,
    service: &str,
    context_path: Option<&Path>,
    output: OutputArgs,
) -> i32 {
    let (registry, _) = match load_registry(path, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let context = match context_path {
        Some(p) => match load_document::<Value>(p, "context document", &output) {
            Ok(v) => v,
            Err(code) => return code,
        },
        None => Value::Object(Default::default()),
    };

    let Some(policy) = registry
        .get(backend)
        .and_then(|b| b.service(service))
        .map(|s| s.request_policy())
    else {
        print_error(
            output.format,
            output.quiet,
            &format!("backend `{backend}` has no service `{service}`"),
        );
        return exit_codes::CONFIG_INVALID;
    };

    let mut cntl = CallController::new("render", service, context);
    if let Err(e) = policy.run(&mut cntl) {
        print_error(output.format, output.quiet, &e.to_string());
        return exit_codes::CALL_FAILED;
    }

    let request = cntl.request();
    let result = RenderResult {
        backend,
        service,
        target: request.uri_with_query(),
        request,
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!(
            "{} {}{}",
            request.method.as_str(),
            request.endpoint.as_deref().unwrap_or_default(),
            result.target
        );
        if !request.content_type.is_empty() {
            println!("Content-Type: {}", request.content_type);
        }
        for (name, value) in &request.headers {
            println!("{name}: {value}");
        }
        if !request.body.is_empty() {
            println!();
            println!("{}", String::from_utf8_lossy(&request.body));
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
