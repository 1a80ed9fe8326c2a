use std::path::Path;

use relay_core::{parse_document_str, parse_gateway_str, DocumentFormat};
use relay_exec::BackendRegistry;
use serde::de::DeserializeOwned;

use crate::exit_codes;
use crate::output::print_error;
use crate::{OutputArgs, RuntimeArgs};

fn read(path: &Path, output: &OutputArgs) -> Result<String, i32> {
    std::fs::read_to_string(path).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to read {}: {e}", path.display()),
        );
        exit_codes::RUNTIME_ERROR
    })
}

/// Parse and initialize a gateway config. Errors are printed; the exit code is returned.
pub fn load_registry(path: &Path, output: &OutputArgs) -> Result<(BackendRegistry, DocumentFormat), i32> {
    let content = read(path, output)?;
    let parsed = parse_gateway_str(&content, DocumentFormat::Auto).map_err(|e| {
        print_error(output.format, output.quiet, &e.to_string());
        exit_codes::CONFIG_INVALID
    })?;
    let registry = BackendRegistry::from_gateway(&parsed.document).map_err(|e| {
        print_error(output.format, output.quiet, &e.to_string());
        exit_codes::CONFIG_INVALID
    })?;
    Ok((registry, parsed.format))
}

/// A JSON or YAML document other than the gateway config (context, logical request).
pub fn load_document<T: DeserializeOwned>(path: &Path, what: &str, output: &OutputArgs) -> Result<T, i32> {
    let content = read(path, output)?;
    parse_document_str::<T>(&content, DocumentFormat::Auto)
        .map(|parsed| parsed.document)
        .map_err(|e| {
            print_error(output.format, output.quiet, &format!("invalid {what}: {e}"));
            exit_codes::CONFIG_INVALID
        })
}

pub fn build_orchestrator_config(runtime: &RuntimeArgs) -> relay_exec::OrchestratorConfig {
    relay_exec::OrchestratorConfig {
        call_timeout: std::time::Duration::from_millis(runtime.timeout),
        global_concurrency: runtime.max_concurrency,
        max_response_bytes: runtime.max_response_bytes,
    }
}
