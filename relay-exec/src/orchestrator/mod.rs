mod cancel;
pub mod concurrency;
pub mod events;
mod handle;
mod plan;
mod result;
mod scheduler;
pub mod transport;
mod types;
mod worker;

pub use cancel::select_victims;
pub use events::{CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink};
pub use handle::CallHandle;
pub use plan::{CallGraph, LogicalRequest, PlannedCall};
pub use result::{CallReport, OrchestratorError, RequestOutcome};
pub use scheduler::{Orchestrator, RESPONSES_KEY};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{select_mode, CallState, CancelOrder, DispatchMode, OrchestratorConfig};
