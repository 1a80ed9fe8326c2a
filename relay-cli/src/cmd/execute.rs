use std::path::Path;
use std::sync::Arc;

use relay_exec::orchestrator::{EventSink, NoOpEventSink, StdoutEventSink};
use relay_exec::{CallState, LogicalRequest, Orchestrator, ReqwestTransport};

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, RuntimeArgs};

use super::config::{build_orchestrator_config, load_document, load_registry};

pub async fn execute_cmd(
    path: &Path,
    request_path: &Path,
    events: bool,
    output: OutputArgs,
    runtime: RuntimeArgs,
) -> i32 {
    let (registry, _) = match load_registry(path, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let request = match load_document::<LogicalRequest>(request_path, "logical request", &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let transport = match ReqwestTransport::new() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let sink: Arc<dyn EventSink> = if events {
        Arc::new(StdoutEventSink)
    } else {
        Arc::new(NoOpEventSink)
    };

    let orchestrator = Orchestrator::new(
        build_orchestrator_config(&runtime),
        Arc::new(registry),
        transport,
        sink,
    );

    // Ctrl-C cancels the outstanding calls; the partial outcome is still printed.
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let outcome = match orchestrator.execute_with_cancel(request, cancel).await {
        Ok(o) => o,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::CONFIG_INVALID;
        }
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!("request {}", outcome.request_id);
        for call in &outcome.calls {
            match &call.error {
                Some(err) => println!("- {} [{}] {}: {err}", call.call_id, call.service, call.state.as_str()),
                None => println!("- {} [{}] {}", call.call_id, call.service, call.state.as_str()),
            }
        }
        for id in &outcome.skipped {
            println!("- {id} skipped");
        }
        for diagnostic in &outcome.diagnostics {
            println!("warning: {diagnostic}");
        }
        if let Ok(json) = serde_json::to_string_pretty(&outcome.response) {
            println!("{json}");
        }
    } else {
        print_result(output.format, output.quiet, &outcome);
    }

    if outcome.count(CallState::Failed) > 0 || !outcome.skipped.is_empty() {
        exit_codes::CALL_FAILED
    } else {
        exit_codes::SUCCESS
    }
}
