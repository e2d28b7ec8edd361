//! Conversion of documents to JSON.

use crate::{Scalar, YamlKind, YamlNode};
use serde_json::{Map, Number, Value};

/// Convert a document to JSON. Mapping keys become strings, non-finite
/// floats become `null`, and unresolved aliases are written as `*name`.
pub fn to_json(node: &YamlNode) -> Value {
    match &node.kind {
        YamlKind::Scalar(scalar) => scalar_to_json(scalar),
        YamlKind::Alias(name) => Value::String(format!("*{}", name)),
        YamlKind::Sequence(items) => Value::Array(items.iter().map(to_json).collect()),
        YamlKind::Mapping(entries) => {
            let mut map = Map::new();
            for entry in entries {
                map.insert(key_text(&entry.key), to_json(&entry.value));
            }
            Value::Object(map)
        }
    }
}

fn scalar_to_json(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::Number((*i).into()),
        Scalar::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Scalar::String(s) => Value::String(s.clone()),
    }
}

fn key_text(key: &YamlNode) -> String {
    match to_json(key) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
