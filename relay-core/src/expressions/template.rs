use super::runtime::{parse_reference, Reference, ReferenceError};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Expr(Reference),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }
}

pub fn parse_template(input: &str) -> Result<Template, TemplateError> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            // Only `{ $... }` is an embedded reference; JSON-looking text stays literal.
            let mut lookahead = chars.clone();
            while let Some(ws) = lookahead.peek() {
                if ws.is_whitespace() {
                    lookahead.next();
                } else {
                    break;
                }
            }
            if !matches!(lookahead.peek(), Some('$')) {
                buf.push('{');
                continue;
            }

            // No nesting.
            let mut inner = String::new();
            let mut found = false;
            for n in chars.by_ref() {
                if n == '}' {
                    found = true;
                    break;
                }
                inner.push(n);
            }
            if !found {
                return Err(TemplateError::UnclosedExpression);
            }

            let reference = parse_reference(inner.trim()).map_err(TemplateError::InvalidReference)?;
            if !buf.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut buf)));
            }
            segments.push(Segment::Expr(reference));
        } else {
            buf.push(ch);
        }
    }

    if !buf.is_empty() {
        segments.push(Segment::Literal(buf));
    }

    Ok(Template { segments })
}

/// Check every reference and embedded template inside `value`.
pub fn validate_value_expressions(value: &Value) -> Result<(), TemplateError> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('$') {
                parse_reference(trimmed).map_err(TemplateError::InvalidReference)?;
                return Ok(());
            }
            parse_template(s).map(|_| ())
        }
        Value::Array(arr) => arr.iter().try_for_each(validate_value_expressions),
        Value::Object(map) => map.values().try_for_each(validate_value_expressions),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid reference: {0}")]
    InvalidReference(#[from] ReferenceError),
    #[error("unclosed embedded expression (missing '}}')")]
    UnclosedExpression,
}
