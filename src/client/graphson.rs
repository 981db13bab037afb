//! GraphSON helpers.
//!
//! Depending on the server serializer, results come back as plain JSON
//! (GraphSON 1) or wrapped in `{"@type": ..., "@value": ...}` envelopes
//! (GraphSON 2/3). Everything downstream works on the plain form.

use serde_json::{Map, Value};

/// Strip GraphSON type envelopes, recursively.
///
/// `g:Map` values (flat key/value lists in GraphSON 3) become objects;
/// non-string keys are rendered with their JSON text.
pub fn untype(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("@type") && map.contains_key("@value") => {
            let ty = map.remove("@type");
            let inner = map.remove("@value").unwrap_or(Value::Null);
            match (ty.as_ref().and_then(Value::as_str), inner) {
                (Some("g:Map"), Value::Array(flat)) => {
                    let mut object = Map::new();
                    let mut entries = flat.into_iter().map(untype);
                    while let (Some(k), Some(v)) = (entries.next(), entries.next()) {
                        let key = match k {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        object.insert(key, v);
                    }
                    Value::Object(object)
                }
                (_, inner) => untype(inner),
            }
        }
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, untype(v))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(untype).collect()),
        other => other,
    }
}

/// Read a count result (`[3]` or its typed form).
pub fn as_count(items: &[Value]) -> Option<u64> {
    items.first().and_then(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_values_are_untouched() {
        let v = json!([{"id": "a", "n": 1}]);
        assert_eq!(untype(v.clone()), v);
    }

    #[test]
    fn test_typed_scalars_and_lists() {
        let v = json!({"@type": "g:List", "@value": [
            {"@type": "g:Int64", "@value": 2},
            "x"
        ]});
        assert_eq!(untype(v), json!([2, "x"]));
    }

    #[test]
    fn test_typed_map() {
        let v = json!({"@type": "g:Map", "@value": [
            "id", "vmi-1",
            "tags", {"@type": "g:List", "@value": ["a"]}
        ]});
        assert_eq!(untype(v), json!({"id": "vmi-1", "tags": ["a"]}));
    }

    #[test]
    fn test_as_count() {
        assert_eq!(as_count(&[json!(3)]), Some(3));
        assert_eq!(as_count(&[]), None);
        assert_eq!(as_count(&[json!("3")]), None);
    }
}
