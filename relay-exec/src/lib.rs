#![forbid(unsafe_code)]

//! Backend call orchestration: per-service request/response policies and the
//! orchestrator that dispatches, chains and cancels the calls of a logical request.
//!
//! Configuration parsing and the expression language live in `relay-core`.

pub mod backend;
pub mod orchestrator;
pub mod policy;

pub use crate::backend::{Backend, BackendRegistry, Service};
pub use crate::orchestrator::{
    CallState, CancelOrder, DispatchMode, LogicalRequest, Orchestrator, OrchestratorConfig,
    OrchestratorError, PlannedCall, RequestOutcome, ReqwestTransport, Transport, TransportError,
};
pub use crate::policy::{CallController, RequestPolicy, ResponsePolicy, WireRequest, WireResponse};
