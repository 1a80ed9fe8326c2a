use crate::value::{self, Value};

/// RFC 6901 pointer, as written after `#` in a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPointer {
    raw: String,
}

impl JsonPointer {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn parse(fragment: &str) -> Result<Self, JsonPointerError> {
        // "" addresses the whole value.
        if fragment.is_empty() {
            return Ok(Self {
                raw: fragment.to_string(),
            });
        }
        if !fragment.starts_with('/') {
            return Err(JsonPointerError::InvalidPrefix);
        }

        let mut chars = fragment.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '~' {
                match chars.next() {
                    Some('0' | '1') => {}
                    _ => return Err(JsonPointerError::InvalidEscape),
                }
            }
        }

        Ok(Self {
            raw: fragment.to_string(),
        })
    }

    /// Unescaped reference tokens.
    pub fn tokens(&self) -> Vec<String> {
        if self.raw.is_empty() {
            return Vec::new();
        }
        self.raw[1..]
            .split('/')
            .map(|t| t.replace("~1", "/").replace("~0", "~"))
            .collect()
    }

    /// Walk `root`, returning the first token that could not be followed on failure.
    pub fn resolve<'a>(&self, root: &'a Value) -> Result<&'a Value, String> {
        let mut cur = root;
        for token in self.tokens() {
            cur = value::child(cur, &token).ok_or(token)?;
        }
        Ok(cur)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonPointerError {
    #[error("json pointer must start with '/'")]
    InvalidPrefix,
    #[error("json pointer contains invalid escape (only ~0 and ~1 are allowed)")]
    InvalidEscape,
}
