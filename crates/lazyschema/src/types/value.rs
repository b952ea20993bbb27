use serde_json::Value;

/// Expression-level behavior of document values.
///
/// Values are plain `serde_json::Value`s; this trait adds the coercions the
/// expression dialect needs.
///
/// # Example
///
/// ```
/// use lazyschema::ValueExt;
/// use serde_json::json;
///
/// assert!(json!("text").truthy());
/// assert!(!json!(0).truthy());
/// assert_eq!(json!(null).render(), "");
/// assert_eq!(json!([1, 2]).render(), "[1,2]");
/// ```
pub trait ValueExt {
    /// Falsy values are `null`, `false`, `0` and `""`.
    fn truthy(&self) -> bool;

    /// Text used when the value is interpolated into a template.
    fn render(&self) -> String;

    /// Short name of the value's JSON type, for error messages.
    fn kind(&self) -> &'static str;

    /// Equality that treats `1` and `1.0` as equal.
    fn loose_eq(&self, other: &Value) -> bool;
}

impl ValueExt for Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => self.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            _ => self == other,
        }
    }
}

/// Step into `value` by one key or array index.
pub fn child_value<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Follow `segments` down from `value`.
pub fn descend<'v>(value: &'v Value, segments: &[String]) -> Option<&'v Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| child_value(current, segment))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn loose_eq_compares_numbers_by_value() {
        assert!(json!(1).loose_eq(&json!(1.0)));
        assert!(!json!(1).loose_eq(&json!("1")));
        assert!(json!({"a": [1]}).loose_eq(&json!({"a": [1]})));
    }

    #[test]
    fn descend_handles_objects_and_arrays() {
        let doc = json!({"items": [{"title": "first"}]});
        let path = vec!["items".to_string(), "0".to_string(), "title".to_string()];
        assert_eq!(descend(&doc, &path), Some(&json!("first")));
        let missing = vec!["items".to_string(), "3".to_string()];
        assert_eq!(descend(&doc, &missing), None);
    }
}
