use std::collections::BTreeMap;

use crate::error::ConfigError;

use super::block::{BlockConfig, ExpressionBlock};
use super::gateway::NamedBlockConfig;
use super::ConfigKind;

/// Named templates of one kind, fully resolved.
#[derive(Debug, Clone)]
pub struct TemplateTable {
    kind: ConfigKind,
    blocks: BTreeMap<String, ExpressionBlock>,
}

impl TemplateTable {
    pub fn empty(kind: ConfigKind) -> Self {
        Self {
            kind,
            blocks: BTreeMap::new(),
        }
    }

    /// Resolve every template, following includes between templates of this kind.
    pub fn build(kind: ConfigKind, templates: &[NamedBlockConfig]) -> Result<Self, ConfigError> {
        let mut raw = BTreeMap::new();
        for t in templates {
            if raw.insert(t.name.as_str(), t.block()).is_some() {
                return Err(ConfigError::DuplicateTemplate {
                    kind,
                    name: t.name.clone(),
                });
            }
        }

        let mut table = Self::empty(kind);
        for t in templates {
            let mut chain = Vec::new();
            table.resolve(&raw, &t.name, &mut chain)?;
        }
        Ok(table)
    }

    fn resolve(
        &mut self,
        raw: &BTreeMap<&str, BlockConfig>,
        name: &str,
        chain: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        if self.blocks.contains_key(name) {
            return Ok(());
        }
        if chain.iter().any(|n| n == name) {
            chain.push(name.to_string());
            return Err(ConfigError::CyclicInclude {
                kind: self.kind,
                chain: std::mem::take(chain),
            });
        }
        let config = raw.get(name).ok_or_else(|| ConfigError::UnknownTemplate {
            kind: self.kind,
            name: name.to_string(),
        })?;

        chain.push(name.to_string());
        if let Some(include) = &config.include {
            self.resolve(raw, include, chain)?;
        }
        chain.pop();

        let kind = self.kind;
        let block = config.resolve_with(kind, |n| self.blocks.get(n))?;
        self.blocks.insert(name.to_string(), block);
        Ok(())
    }

    pub fn kind(&self) -> ConfigKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&ExpressionBlock> {
        self.blocks.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
