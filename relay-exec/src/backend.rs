use std::collections::BTreeMap;
use std::sync::Arc;

use relay_core::{
    BackendConfig, ChannelConfig, ConfigError, ConfigKind, ExpressionBlock, GatewayConfig,
    ServiceConfig, TemplateTable,
};
use tracing::info;

use crate::policy::{RequestPolicy, ResponsePolicy};

/// A service's initialized policy pair.
#[derive(Debug, Clone)]
pub struct Service {
    name: String,
    request: RequestPolicy,
    response: ResponsePolicy,
}

impl Service {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_policy(&self) -> &RequestPolicy {
        &self.request
    }

    pub fn response_policy(&self) -> &ResponsePolicy {
        &self.response
    }
}

/// One backend: its channel options, template tables and services. Immutable once built.
#[derive(Debug, Clone)]
pub struct Backend {
    name: String,
    channel: ChannelConfig,
    request_templates: TemplateTable,
    response_templates: TemplateTable,
    services: BTreeMap<String, Service>,
}

impl Backend {
    pub fn new(name: impl Into<String>, channel: ChannelConfig) -> Self {
        Self {
            name: name.into(),
            channel,
            request_templates: TemplateTable::empty(ConfigKind::Request),
            response_templates: TemplateTable::empty(ConfigKind::Response),
            services: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ConfigError> {
        let mut backend = Self::new(config.name.clone(), config.channel.clone());
        backend.request_templates = TemplateTable::build(ConfigKind::Request, &config.request_templates)?;
        backend.response_templates =
            TemplateTable::build(ConfigKind::Response, &config.response_templates)?;
        for service in &config.services {
            backend.add_service(service)?;
        }
        Ok(backend)
    }

    /// Initialize both policies of `config` against this backend's templates.
    pub fn add_service(&mut self, config: &ServiceConfig) -> Result<(), ConfigError> {
        if self.services.contains_key(&config.name) {
            return Err(ConfigError::DuplicateService {
                backend: self.name.clone(),
                service: config.name.clone(),
            });
        }
        let wrap = |source: ConfigError| ConfigError::Service {
            backend: self.name.clone(),
            service: config.name.clone(),
            source: Box::new(source),
        };
        let request = RequestPolicy::init(&config.request, self).map_err(wrap)?;
        let response = ResponsePolicy::init(&config.response, self).map_err(wrap)?;
        self.services.insert(
            config.name.clone(),
            Service {
                name: config.name.clone(),
                request,
                response,
            },
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> &ChannelConfig {
        &self.channel
    }

    pub fn lookup_request_template(&self, name: &str) -> Option<&ExpressionBlock> {
        self.request_templates.get(name)
    }

    pub fn lookup_response_template(&self, name: &str) -> Option<&ExpressionBlock> {
        self.response_templates.get(name)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }
}

/// All backends of a gateway, by name.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<Backend>>,
}

impl BackendRegistry {
    pub fn from_gateway(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for backend in &config.backends {
            registry.insert(Backend::from_config(backend)?)?;
        }
        info!(backends = registry.len(), "initialized backends");
        Ok(registry)
    }

    pub fn insert(&mut self, backend: Backend) -> Result<(), ConfigError> {
        if self.backends.contains_key(backend.name()) {
            return Err(ConfigError::DuplicateBackend(backend.name().to_string()));
        }
        self.backends
            .insert(backend.name().to_string(), Arc::new(backend));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Backend>> {
        self.backends.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Backend>> {
        self.backends.values()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
