use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::orchestrator::concurrency::ConcurrencyLimits;
use crate::orchestrator::transport::{Transport, TransportError};
use crate::policy::{WireRequest, WireResponse};

/// Everything a spawned call task owns.
pub(crate) struct CallTask {
    pub call_id: String,
    pub backend: String,
    pub request: WireRequest,
    pub timeout: Duration,
    pub max_response_bytes: usize,
    pub transport: Arc<dyn Transport>,
    pub limits: Arc<ConcurrencyLimits>,
}

pub(crate) type CallResult = (String, Result<WireResponse, TransportError>);

/// Send one wire request under the backend's concurrency permit. The timeout covers the
/// wait for a permit too, so a call never outlives it.
pub(crate) async fn run_call(task: CallTask) -> CallResult {
    let CallTask {
        call_id,
        backend,
        request,
        timeout,
        max_response_bytes,
        transport,
        limits,
    } = task;

    let send = async {
        let _permit = limits.acquire(&backend).await;
        debug!(call_id = %call_id, backend = %backend, uri = %request.uri, "sending call");
        transport.send(request, timeout, max_response_bytes).await
    };

    let result = match tokio::time::timeout(timeout, send).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    };
    (call_id, result)
}
