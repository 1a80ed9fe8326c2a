use std::sync::LazyLock;

use regex::Regex;

use super::json_pointer::{JsonPointer, JsonPointerError};

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_]+$").expect("valid regex"));

/// `$root.segment.segment#/pointer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub root: String,
    pub path: Vec<String>,
    pub pointer: Option<JsonPointer>,
}

impl Reference {
    /// Dotted form without the `$`, used in error messages.
    pub fn display_path(&self) -> String {
        let mut out = self.root.clone();
        for seg in &self.path {
            out.push('.');
            out.push_str(seg);
        }
        if let Some(ptr) = &self.pointer {
            out.push('#');
            out.push_str(ptr.as_str());
        }
        out
    }
}

pub fn parse_reference(input: &str) -> Result<Reference, ReferenceError> {
    let s = input.trim();
    let Some(body) = s.strip_prefix('$') else {
        return Err(ReferenceError::MissingDollarPrefix);
    };

    let (head, pointer) = match body.split_once('#') {
        Some((head, frag)) => (
            head,
            Some(JsonPointer::parse(frag).map_err(ReferenceError::InvalidJsonPointer)?),
        ),
        None => (body, None),
    };

    let mut parts = head.split('.');
    let root = parts.next().unwrap_or_default();
    validate_segment(root)?;

    let mut path = Vec::new();
    for p in parts {
        validate_segment(p)?;
        path.push(p.to_string());
    }

    Ok(Reference {
        root: root.to_string(),
        path,
        pointer,
    })
}

fn validate_segment(name: &str) -> Result<(), ReferenceError> {
    if name.is_empty() {
        return Err(ReferenceError::EmptyName);
    }
    if !SEGMENT_RE.is_match(name) {
        return Err(ReferenceError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference must start with '$'")]
    MissingDollarPrefix,
    #[error("name segment must not be empty")]
    EmptyName,
    #[error("invalid name segment: {0}")]
    InvalidName(String),
    #[error("invalid json pointer: {0}")]
    InvalidJsonPointer(#[from] JsonPointerError),
}
