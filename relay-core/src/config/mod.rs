mod block;
mod gateway;
mod templates;

use std::fmt;

pub use block::{BlockConfig, ExpressionBlock, Statement};
pub use gateway::{BackendConfig, ChannelConfig, GatewayConfig, NamedBlockConfig, ServiceConfig};
pub use templates::TemplateTable;

/// Which template table a block config resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Request,
    Response,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::Request => f.write_str("request"),
            ConfigKind::Response => f.write_str("response"),
        }
    }
}
