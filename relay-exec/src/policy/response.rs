use relay_core::{BlockConfig, ConfigError, ConfigKind, EvaluationError, ExpressionBlock, ExpressionContext, Value};
use tracing::{debug, error, warn};

use crate::backend::Backend;

use super::controller::CallController;

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("no wire response to parse")]
    NoResponse,
    #[error("malformed JSON response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to generate response block: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("response block produced no `output`")]
    MissingOutput,
}

/// Interprets the wire response of one service through its response block.
#[derive(Debug, Clone)]
pub struct ResponsePolicy {
    block: ExpressionBlock,
}

impl ResponsePolicy {
    /// Resolve `config` against the backend's response templates.
    pub fn init(config: &BlockConfig, backend: &Backend) -> Result<Self, ConfigError> {
        let block = config
            .resolve_with(ConfigKind::Response, |name| backend.lookup_response_template(name))
            .inspect_err(|e| error!(backend = backend.name(), error = %e, "failed to init response config"))?;
        Ok(Self { block })
    }

    pub fn block(&self) -> &ExpressionBlock {
        &self.block
    }

    /// Parse the wire response, bind it as `response`, run the block and move the
    /// produced `output` into the controller.
    pub fn run(&self, cntl: &mut CallController) -> Result<(), ResponseError> {
        let wire = cntl.response().ok_or(ResponseError::NoResponse)?;
        let parsed = if wire.content_type.contains("application/json") {
            serde_json::from_slice::<Value>(&wire.body).inspect_err(|e| {
                warn!(call_id = cntl.call_id(), error = %e, "failed to parse JSON response")
            })?
        } else {
            Value::String(String::from_utf8_lossy(&wire.body).into_owned())
        };

        let output = {
            let mut ctx = ExpressionContext::new(
                format!("response block {}", cntl.service_name()),
                cntl.context(),
            );
            ctx.set_variable("response", parsed);
            self.block.run(&mut ctx).inspect_err(|e| {
                warn!(call_id = cntl.call_id(), error = %e, "failed to generate response block")
            })?;
            debug!(call_id = cntl.call_id(), block = %ctx, "generated response block");

            match ctx.take_variable("output") {
                Some(output) => output,
                None => {
                    warn!(call_id = cntl.call_id(), "no output found");
                    return Err(ResponseError::MissingOutput);
                }
            }
        };

        cntl.set_output(output);
        Ok(())
    }
}
