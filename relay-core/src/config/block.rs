use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ExpressionContext;
use crate::error::{ConfigError, EvaluationError};
use crate::expressions::{eval_value, validate_value_expressions};
use crate::value::Value;

use super::ConfigKind;

/// One `name = value` rule. `value` is evaluated by [`eval_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub name: String,
    pub value: Value,
}

impl Statement {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Block config as written: an optional template include plus local statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl BlockConfig {
    /// Merge this config over its included template (looked up through `lookup`).
    pub fn resolve_with<'t, F>(&self, kind: ConfigKind, lookup: F) -> Result<ExpressionBlock, ConfigError>
    where
        F: FnOnce(&str) -> Option<&'t ExpressionBlock>,
    {
        let template = match &self.include {
            Some(name) => Some(lookup(name).ok_or_else(|| ConfigError::UnknownTemplate {
                kind,
                name: name.clone(),
            })?),
            None => None,
        };
        ExpressionBlock::merge(template, &self.statements)
    }
}

/// Resolved, immutable statement list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionBlock {
    statements: Vec<Statement>,
}

impl ExpressionBlock {
    /// Template statements first; a local statement with a template name replaces it in
    /// place, the others are appended in order.
    pub fn merge(template: Option<&ExpressionBlock>, local: &[Statement]) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        for stmt in local {
            if stmt.name.is_empty() {
                return Err(ConfigError::EmptyStatementName);
            }
            if !seen.insert(stmt.name.as_str()) {
                return Err(ConfigError::DuplicateStatement {
                    name: stmt.name.clone(),
                });
            }
            validate_value_expressions(&stmt.value).map_err(|source| {
                ConfigError::InvalidExpression {
                    name: stmt.name.clone(),
                    source,
                }
            })?;
        }

        let mut statements = template.map(|t| t.statements.clone()).unwrap_or_default();
        for stmt in local {
            match statements.iter_mut().find(|s| s.name == stmt.name) {
                Some(slot) => *slot = stmt.clone(),
                None => statements.push(stmt.clone()),
            }
        }
        Ok(Self { statements })
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Evaluate every statement in order, binding each result in `ctx`.
    ///
    /// Stops at the first failing statement; earlier bindings stay in `ctx`.
    pub fn run(&self, ctx: &mut ExpressionContext<'_>) -> Result<(), EvaluationError> {
        for stmt in &self.statements {
            let value = eval_value(&stmt.value, ctx).map_err(|kind| EvaluationError {
                context: ctx.name().to_string(),
                statement: stmt.name.clone(),
                kind,
            })?;
            ctx.set_variable(stmt.name.clone(), value);
        }
        debug!(context = %ctx, "evaluated block");
        Ok(())
    }
}
