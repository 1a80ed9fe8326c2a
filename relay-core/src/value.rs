//! The document model shared by request variables, response bodies and outputs.
//!
//! `Value` is `serde_json::Value` built with `preserve_order`, so object keys are unique
//! and keep insertion order. Conversions to text are explicit: nothing in relay coerces
//! a value implicitly.

pub type Value = serde_json::Value;
pub type Map = serde_json::Map<String, Value>;

/// Canonical compact JSON text of a value.
pub fn json_encode(value: &Value) -> String {
    // `Display` for `serde_json::Value` is the compact serializer and cannot fail.
    value.to_string()
}

/// Text form used wherever a string is required: strings are taken verbatim,
/// everything else is JSON-encoded.
pub fn encode_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => json_encode(other),
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Descend one step into `value`: object key, or array index when `segment` is numeric.
pub fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Insert a copy of `value` under `key` in `target`, turning `target` into an object first
/// if it is not one already.
pub fn merge_into(target: &mut Value, key: &str, value: &Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        map.insert(key.to_string(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_text_keeps_strings_verbatim() {
        assert_eq!(encode_text(&json!("a b")), "a b");
        assert_eq!(encode_text(&json!(1)), "1");
        assert_eq!(encode_text(&json!(true)), "true");
        assert_eq!(encode_text(&json!(null)), "null");
        assert_eq!(encode_text(&json!({"k": [1, "x"]})), r#"{"k":[1,"x"]}"#);
    }

    #[test]
    fn object_keys_keep_insertion_order() {
        let v: Value = serde_json::from_str(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(json_encode(&v), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn child_indexes_arrays_by_numeric_segment() {
        let v = json!({"items": [10, 20]});
        let items = child(&v, "items").unwrap();
        assert_eq!(child(items, "1"), Some(&json!(20)));
        assert_eq!(child(items, "2"), None);
        assert_eq!(child(items, "x"), None);
    }

    #[test]
    fn merge_into_replaces_non_objects() {
        let mut target = json!("scalar");
        merge_into(&mut target, "k", &json!(1));
        assert_eq!(target, json!({"k": 1}));
    }
}
