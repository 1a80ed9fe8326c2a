mod eval;
mod json_pointer;
mod runtime;
mod template;

pub use eval::eval_value;
pub use json_pointer::{JsonPointer, JsonPointerError};
pub use runtime::{parse_reference, Reference, ReferenceError};
pub use template::{parse_template, validate_value_expressions, Segment, Template, TemplateError};
