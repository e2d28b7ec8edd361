// Default value interpolation

use indexmap::IndexMap;

use super::Schema;
use crate::node::{Node, Value};

/// Fill absent object properties from the schema.
///
/// An absent property gets its schema default if it has one. Otherwise a
/// placeholder is built from the property's own schema and inserted only
/// when it came out non-empty, so nested defaults appear without creating
/// empty objects. Present values are descended into.
pub fn interpolate_defaults(node: &mut Node, schema: &Schema) {
    match (&mut node.value, schema) {
        (Value::Map(map), Schema::Object(object)) => {
            for (name, property) in &object.properties {
                match map.get_mut(name) {
                    Some(value) => interpolate_defaults(value, property),
                    None => {
                        if let Some(value) = default_value(property) {
                            map.insert(name.clone(), value);
                        }
                    }
                }
            }
        }
        (Value::Array(items), Schema::Array(array)) => {
            if let Some(item_schema) = &array.items {
                for item in items.iter_mut() {
                    interpolate_defaults(item, item_schema);
                }
            }
        }
        _ => {}
    }
}

/// The value to insert for an absent property, if any.
fn default_value(schema: &Schema) -> Option<Node> {
    if let Some(default) = &schema.annotations().default {
        let mut value = default.clone();
        interpolate_defaults(&mut value, schema);
        return Some(value);
    }

    let Schema::Object(object) = schema else {
        return None;
    };
    let mut map = IndexMap::new();
    for (name, property) in &object.properties {
        if let Some(value) = default_value(property) {
            map.insert(name.clone(), value);
        }
    }
    (!map.is_empty()).then(|| Node::map(map))
}
