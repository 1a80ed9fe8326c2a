use std::fmt;

use crate::value::{self, Map, Value};

/// A named evaluation scope.
///
/// Reads fall through from the local variables to the parent contexts and finally to the
/// ambient document. Writes only ever land in the local variables; callers merge them back
/// explicitly.
#[derive(Debug)]
pub struct ExpressionContext<'a> {
    name: String,
    ambient: &'a Value,
    parent: Option<&'a ExpressionContext<'a>>,
    variables: Map,
}

impl<'a> ExpressionContext<'a> {
    pub fn new(name: impl Into<String>, ambient: &'a Value) -> Self {
        Self {
            name: name.into(),
            ambient,
            parent: None,
            variables: Map::new(),
        }
    }

    /// Nested scope sharing this context's ambient document.
    pub fn child<'b>(&'b self, name: impl Into<String>) -> ExpressionContext<'b>
    where
        'a: 'b,
    {
        ExpressionContext {
            name: name.into(),
            ambient: self.ambient,
            parent: Some(self),
            variables: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ambient(&self) -> &'a Value {
        self.ambient
    }

    pub fn parent(&self) -> Option<&ExpressionContext<'a>> {
        self.parent
    }

    /// Local variable only.
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Resolve a root name: local variables, then parents, then the ambient document.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some(v) = self.variables.get(name) {
            return Some(v);
        }
        match self.parent {
            Some(parent) => parent.lookup(name),
            None => value::child(self.ambient, name).filter(|_| self.ambient.is_object()),
        }
    }

    /// Returns the previous value bound to `name`, if any.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.variables.insert(name.into(), value)
    }

    pub fn take_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.shift_remove(name)
    }

    pub fn variables(&self) -> &Map {
        &self.variables
    }

    pub fn into_variables(self) -> Map {
        self.variables
    }
}

impl fmt::Display for ExpressionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars = Value::Object(self.variables.clone());
        write!(f, "{} {}", self.name, value::json_encode(&vars))
    }
}
