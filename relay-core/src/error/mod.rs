use thiserror::Error;

use crate::config::ConfigKind;
use crate::expressions::TemplateError;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to auto-detect document format (neither valid JSON nor valid YAML)")]
    UnknownFormat,
}

/// Initialization failures. Nothing runs when one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown {kind} template: {name}")]
    UnknownTemplate { kind: ConfigKind, name: String },
    #[error("cyclic {kind} template include: {}", chain.join(" -> "))]
    CyclicInclude { kind: ConfigKind, chain: Vec<String> },
    #[error("duplicate {kind} template: {name}")]
    DuplicateTemplate { kind: ConfigKind, name: String },
    #[error("statement `{name}` declared more than once in one block")]
    DuplicateStatement { name: String },
    #[error("statement name must not be empty")]
    EmptyStatementName,
    #[error("statement `{name}`: {source}")]
    InvalidExpression {
        name: String,
        #[source]
        source: TemplateError,
    },
    #[error("duplicate backend: {0}")]
    DuplicateBackend(String),
    #[error("backend `{backend}`: duplicate service `{service}`")]
    DuplicateService { backend: String, service: String },
    #[error("backend `{backend}`, service `{service}`: {source}")]
    Service {
        backend: String,
        service: String,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Why a single statement could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalErrorKind {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("path `{path}` does not exist (no `{segment}`)")]
    MissingPath { path: String, segment: String },
    #[error("malformed expression: {0}")]
    Syntax(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: statement `{statement}` failed: {kind}")]
pub struct EvaluationError {
    pub context: String,
    pub statement: String,
    pub kind: EvalErrorKind,
}
