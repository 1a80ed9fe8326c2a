use std::path::Path;

use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

use super::config::load_registry;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    backends: Vec<BackendSummary>,
}

#[derive(Serialize)]
struct BackendSummary {
    name: String,
    services: Vec<String>,
}

pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    let (registry, format) = match load_registry(path, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let result = ValidateResult {
        valid: true,
        format: format!("{format:?}"),
        backends: registry
            .iter()
            .map(|b| BackendSummary {
                name: b.name().to_string(),
                services: b.services().map(|s| s.name().to_string()).collect(),
            })
            .collect(),
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!(
            "ok: valid gateway config ({:?}, {} backends)",
            format,
            registry.len()
        );
        for backend in &result.backends {
            println!("- {}: {}", backend.name, backend.services.join(", "));
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
