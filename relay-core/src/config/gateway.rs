use serde::{Deserialize, Serialize};

use super::block::BlockConfig;

/// Top-level gateway document: the backends and their services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub name: String,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub request_templates: Vec<NamedBlockConfig>,
    #[serde(default)]
    pub response_templates: Vec<NamedBlockConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Transport options applied when a call's endpoint is initialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Per-call timeout; the orchestrator default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Max in-flight calls to this backend across all logical requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedBlockConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default)]
    pub statements: Vec<super::Statement>,
}

impl NamedBlockConfig {
    pub fn block(&self) -> BlockConfig {
        BlockConfig {
            include: self.include.clone(),
            statements: self.statements.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    pub request: BlockConfig,
    pub response: BlockConfig,
}
