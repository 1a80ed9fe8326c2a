use relay_core::value::{self, type_name};
use relay_core::{BlockConfig, ConfigError, ConfigKind, EvaluationError, ExpressionBlock, ExpressionContext, Value};
use tracing::{debug, error};

use crate::backend::Backend;

use super::controller::CallController;
use super::wire::{HttpMethod, WireRequest};

const CONTENT_TYPE_KEY: &str = "Content-Type";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("failed to generate request block: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("required variable `{0}` is missing")]
    MissingVariable(&'static str),
    #[error("`{variable}` must be {expected}, [{found}] is given")]
    InvalidType {
        variable: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("host [{0}] is not in IP:PORT format")]
    MalformedHost(String),
}

/// Builds the wire request of one service from its request block.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    block: ExpressionBlock,
}

impl RequestPolicy {
    /// Resolve `config` against the backend's request templates.
    pub fn init(config: &BlockConfig, backend: &Backend) -> Result<Self, ConfigError> {
        let block = config
            .resolve_with(ConfigKind::Request, |name| backend.lookup_request_template(name))
            .inspect_err(|e| error!(backend = backend.name(), error = %e, "failed to init request config"))?;
        Ok(Self { block })
    }

    pub fn block(&self) -> &ExpressionBlock {
        &self.block
    }

    /// Evaluate the request block against the call's ambient document and replace the
    /// controller's wire request with the result. Nothing is dispatched here.
    pub fn run(&self, cntl: &mut CallController) -> Result<(), BuildError> {
        let request = {
            let mut ctx = ExpressionContext::new(
                format!("request block {}", cntl.service_name()),
                cntl.context(),
            );
            self.block.run(&mut ctx).inspect_err(|e| {
                error!(call_id = cntl.call_id(), error = %e, "failed to generate request block")
            })?;
            debug!(call_id = cntl.call_id(), block = %ctx, "generated request block");

            build_wire_request(&ctx).inspect_err(|e| {
                error!(call_id = cntl.call_id(), error = %e, "invalid request block")
            })?
        };
        cntl.set_request(request);
        Ok(())
    }
}

fn build_wire_request(ctx: &ExpressionContext<'_>) -> Result<WireRequest, BuildError> {
    let mut request = WireRequest::default();

    request.uri = match ctx.get_variable("http_uri") {
        None => return Err(BuildError::MissingVariable("http_uri")),
        Some(Value::String(uri)) => uri.clone(),
        Some(other) => {
            return Err(BuildError::InvalidType {
                variable: "http_uri",
                expected: "string",
                found: type_name(other),
            })
        }
    };

    // Only the exact lowercase `post` selects POST; any other value keeps GET.
    request.method = match ctx.get_variable("http_method") {
        None => return Err(BuildError::MissingVariable("http_method")),
        Some(Value::String(m)) if m == "post" => HttpMethod::Post,
        Some(_) => HttpMethod::Get,
    };

    let host = match ctx.get_variable("host_ip_port") {
        None => return Err(BuildError::MissingVariable("host_ip_port")),
        Some(Value::String(host)) => host,
        Some(other) => {
            return Err(BuildError::InvalidType {
                variable: "host_ip_port",
                expected: "string",
                found: type_name(other),
            })
        }
    };
    if !host.contains(':') {
        return Err(BuildError::MalformedHost(host.clone()));
    }
    request.endpoint = Some(host.clone());

    if let Some(headers) = ctx.get_variable("http_header") {
        for (name, value) in as_object("http_header", headers)? {
            if value.is_null() {
                continue;
            }
            let text = value::encode_text(value);
            if name == CONTENT_TYPE_KEY {
                request.content_type = text;
            } else {
                request.headers.insert(name.clone(), text);
            }
        }
    }

    if let Some(query) = ctx.get_variable("http_query") {
        for (name, value) in as_object("http_query", query)? {
            if value.is_null() {
                continue;
            }
            request.set_query(name.clone(), value::encode_text(value));
        }
    }

    // JSON bodies only.
    if let Some(body) = ctx.get_variable("http_body") {
        if request.content_type.contains("application/json") {
            request
                .body
                .extend_from_slice(value::json_encode(body).as_bytes());
        }
    }

    Ok(request)
}

fn as_object<'v>(variable: &'static str, v: &'v Value) -> Result<&'v relay_core::Map, BuildError> {
    v.as_object().ok_or(BuildError::InvalidType {
        variable,
        expected: "object",
        found: type_name(v),
    })
}
