use crate::context::ExpressionContext;
use crate::error::EvalErrorKind;
use crate::value::{self, Map, Value};

use super::runtime::{parse_reference, Reference};
use super::template::{parse_template, Segment};

/// Evaluate one statement value against `ctx`.
///
/// Scalars evaluate to themselves, containers member-wise; strings are references
/// (`$name.path`) or templates with embedded `{ $name }` references.
pub fn eval_value(value: &Value, ctx: &ExpressionContext<'_>) -> Result<Value, EvalErrorKind> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(value.clone()),
        Value::String(s) => eval_string(s, ctx),
        Value::Array(arr) => arr
            .iter()
            .map(|v| eval_value(v, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), eval_value(v, ctx)?);
            }
            Ok(Value::Object(out))
        }
    }
}

fn eval_string(s: &str, ctx: &ExpressionContext<'_>) -> Result<Value, EvalErrorKind> {
    let trimmed = s.trim();
    if trimmed.starts_with('$') {
        let reference = parse_reference(trimmed).map_err(|e| EvalErrorKind::Syntax(e.to_string()))?;
        return resolve(&reference, ctx).cloned();
    }

    let tpl = parse_template(s).map_err(|e| EvalErrorKind::Syntax(e.to_string()))?;
    if tpl.is_literal() {
        return Ok(Value::String(s.to_string()));
    }

    let mut out = String::new();
    for seg in &tpl.segments {
        match seg {
            Segment::Literal(l) => out.push_str(l),
            Segment::Expr(reference) => out.push_str(&value::encode_text(resolve(reference, ctx)?)),
        }
    }
    Ok(Value::String(out))
}

fn resolve<'c>(
    reference: &Reference,
    ctx: &'c ExpressionContext<'_>,
) -> Result<&'c Value, EvalErrorKind> {
    let mut cur = ctx
        .lookup(&reference.root)
        .ok_or_else(|| EvalErrorKind::UndefinedVariable(reference.root.clone()))?;

    for seg in &reference.path {
        cur = value::child(cur, seg).ok_or_else(|| EvalErrorKind::MissingPath {
            path: reference.display_path(),
            segment: seg.clone(),
        })?;
    }

    if let Some(ptr) = &reference.pointer {
        cur = ptr.resolve(cur).map_err(|segment| EvalErrorKind::MissingPath {
            path: reference.display_path(),
            segment,
        })?;
    }

    Ok(cur)
}
