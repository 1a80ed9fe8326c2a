#![forbid(unsafe_code)]

//! Value model, expression contexts and template-inheritable block configs.
//!
//! Everything here is synchronous and transport-agnostic; `relay-exec` builds the
//! request/response policies and the call orchestrator on top of it.

pub mod config;
pub mod context;
pub mod error;
pub mod expressions;
pub mod parser;
pub mod value;

pub use crate::config::{
    BackendConfig, BlockConfig, ChannelConfig, ConfigKind, ExpressionBlock, GatewayConfig,
    NamedBlockConfig, ServiceConfig, Statement, TemplateTable,
};
pub use crate::context::ExpressionContext;
pub use crate::error::{ConfigError, EvalErrorKind, EvaluationError, ParseError};
pub use crate::parser::{parse_document_str, parse_gateway_str, DocumentFormat, ParsedDocument};
pub use crate::value::{Map, Value};
