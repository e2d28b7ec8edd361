//! Schema parsing from evaluated values
//!
//! This is what the `schema` builtin uses. A schema is written as a map in
//! JSON Schema style:
//!
//! ```yaml
//! type: object
//! properties:
//!   name: {type: string, minLength: 1}
//!   port: {type: integer, default: 80}
//! required: [name]
//! ```
//!
//! Anywhere a schema is expected, a type name (`string`) or an already
//! built type (`*MyType`) may be given instead.

use indexmap::IndexMap;
use std::rc::Rc;
use yisp_source_map::SourceInfo;

use super::error::{SchemaError, SchemaResult};
use super::{
    AdditionalProperties, ArraySchema, FunctionSchema, NumberSchema, ObjectSchema, OneOfSchema,
    PatchStrategy, Schema, SchemaAnnotations, StringSchema,
};
use crate::node::{Node, Value};

impl Schema {
    /// Build a schema from a schema literal.
    pub fn from_node(node: &Node) -> SchemaResult<Schema> {
        match &node.value {
            Value::Type(schema) => Ok((**schema).clone()),
            Value::String(name) => primitive(name, node.location()),
            Value::Map(map) => from_map(map, node.location()),
            _ => Err(SchemaError::structure(
                format!("expected a schema, got {}", node.kind()),
                node.location(),
            )),
        }
    }
}

fn primitive(name: &str, location: Option<&SourceInfo>) -> SchemaResult<Schema> {
    let schema = match name {
        "any" => Schema::any(),
        "null" => Schema::null(),
        "boolean" => Schema::boolean(),
        "integer" => Schema::integer(),
        "number" => Schema::number(),
        "string" => Schema::string(),
        "array" => Schema::array(None),
        "object" => Schema::object(),
        "function" => Schema::Function(FunctionSchema::default()),
        _ => {
            return Err(SchemaError::structure(
                format!("unknown type '{}'", name),
                location,
            ));
        }
    };
    Ok(schema)
}

fn from_map(map: &IndexMap<String, Node>, location: Option<&SourceInfo>) -> SchemaResult<Schema> {
    let type_name = match map.get("type") {
        Some(node) => Some(
            node.as_str()
                .ok_or_else(|| SchemaError::structure("'type' must be a string", node.location()))?,
        ),
        None => None,
    };
    let type_name = type_name.unwrap_or_else(|| infer_type(map));

    let mut schema = match type_name {
        "object" => Schema::Object(ObjectSchema {
            properties: parse_properties(map)?,
            required: parse_string_list(map, "required")?,
            additional_properties: parse_additional(map)?,
            ..Default::default()
        }),
        "array" => Schema::Array(ArraySchema {
            items: optional_schema(map, "items")?,
            ..Default::default()
        }),
        "integer" | "number" => Schema::Number(NumberSchema {
            integer: type_name == "integer",
            minimum: get_f64(map, "minimum")?,
            maximum: get_f64(map, "maximum")?,
            exclusive_minimum: get_f64(map, "exclusiveMinimum")?,
            exclusive_maximum: get_f64(map, "exclusiveMaximum")?,
            multiple_of: get_f64(map, "multipleOf")?,
            ..Default::default()
        }),
        "string" => Schema::String(StringSchema {
            min_length: get_usize(map, "minLength")?,
            max_length: get_usize(map, "maxLength")?,
            pattern: get_string(map, "pattern")?,
            format: get_string(map, "format")?,
            ..Default::default()
        }),
        "function" => Schema::Function(FunctionSchema {
            arguments: match map.get("arguments") {
                Some(node) => schema_list(node)?,
                None => Vec::new(),
            },
            returns: optional_schema(map, "returns")?,
            ..Default::default()
        }),
        "oneOf" => Schema::OneOf(OneOfSchema {
            schemas: match map.get("oneOf") {
                Some(node) => schema_list(node)?,
                None => Vec::new(),
            },
            ..Default::default()
        }),
        other => primitive(other, map.get("type").and_then(Node::location).or(location))?,
    };

    *schema.annotations_mut() = parse_annotations(map)?;
    Ok(schema)
}

fn infer_type(map: &IndexMap<String, Node>) -> &'static str {
    if map.contains_key("oneOf") {
        "oneOf"
    } else if ["properties", "required", "additionalProperties"]
        .iter()
        .any(|k| map.contains_key(*k))
    {
        "object"
    } else if map.contains_key("items") {
        "array"
    } else if map.contains_key("arguments") || map.contains_key("returns") {
        "function"
    } else {
        "any"
    }
}

fn parse_annotations(map: &IndexMap<String, Node>) -> SchemaResult<SchemaAnnotations> {
    let strategy = match get_string(map, "patchStrategy")? {
        Some(s) => Some(s),
        None => get_string(map, "x-kubernetes-patch-strategy")?,
    };
    let merge_key = match get_string(map, "patchMergeKey")? {
        Some(s) => Some(s),
        None => get_string(map, "x-kubernetes-patch-merge-key")?,
    };
    Ok(SchemaAnnotations {
        id: get_string(map, "$id")?,
        description: get_string(map, "description")?,
        default: map.get("default").cloned(),
        patch_strategy: strategy
            .as_deref()
            .map(PatchStrategy::parse)
            .unwrap_or_default(),
        patch_merge_key: merge_key,
    })
}

fn parse_properties(map: &IndexMap<String, Node>) -> SchemaResult<IndexMap<String, Rc<Schema>>> {
    let Some(node) = map.get("properties") else {
        return Ok(IndexMap::new());
    };
    let properties = node
        .as_map()
        .ok_or_else(|| SchemaError::structure("'properties' must be a map", node.location()))?;
    properties
        .iter()
        .map(|(name, value)| Ok((name.clone(), Rc::new(Schema::from_node(value)?))))
        .collect()
}

fn parse_additional(map: &IndexMap<String, Node>) -> SchemaResult<AdditionalProperties> {
    Ok(match map.get("additionalProperties") {
        None => AdditionalProperties::Allowed,
        Some(node) => match node.value {
            Value::Bool(true) => AdditionalProperties::Allowed,
            Value::Bool(false) => AdditionalProperties::Denied,
            _ => AdditionalProperties::Schema(Rc::new(Schema::from_node(node)?)),
        },
    })
}

fn optional_schema(map: &IndexMap<String, Node>, key: &str) -> SchemaResult<Option<Rc<Schema>>> {
    map.get(key)
        .map(|node| Schema::from_node(node).map(Rc::new))
        .transpose()
}

fn schema_list(node: &Node) -> SchemaResult<Vec<Rc<Schema>>> {
    let items = node
        .as_array()
        .ok_or_else(|| SchemaError::structure("expected a list of schemas", node.location()))?;
    items
        .iter()
        .map(|item| Schema::from_node(item).map(Rc::new))
        .collect()
}

fn parse_string_list(map: &IndexMap<String, Node>, key: &str) -> SchemaResult<Vec<String>> {
    let Some(node) = map.get(key) else {
        return Ok(Vec::new());
    };
    let not_strings = || {
        SchemaError::structure(
            format!("'{}' must be a list of strings", key),
            node.location(),
        )
    };
    node.as_array()
        .ok_or_else(not_strings)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(not_strings))
        .collect()
}

fn get_string(map: &IndexMap<String, Node>, key: &str) -> SchemaResult<Option<String>> {
    match map.get(key) {
        None => Ok(None),
        Some(node) => node.as_str().map(|s| Some(s.to_string())).ok_or_else(|| {
            SchemaError::structure(format!("'{}' must be a string", key), node.location())
        }),
    }
}

fn get_f64(map: &IndexMap<String, Node>, key: &str) -> SchemaResult<Option<f64>> {
    match map.get(key).map(|node| (node, &node.value)) {
        None => Ok(None),
        Some((_, Value::Int(i))) => Ok(Some(*i as f64)),
        Some((_, Value::Float(f))) => Ok(Some(*f)),
        Some((node, _)) => Err(SchemaError::structure(
            format!("'{}' must be a number", key),
            node.location(),
        )),
    }
}

fn get_usize(map: &IndexMap<String, Node>, key: &str) -> SchemaResult<Option<usize>> {
    match map.get(key).map(|node| (node, &node.value)) {
        None => Ok(None),
        Some((_, Value::Int(i))) if *i >= 0 => Ok(Some(*i as usize)),
        Some((node, _)) => Err(SchemaError::structure(
            format!("'{}' must be a non-negative integer", key),
            node.location(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(json: serde_json::Value) -> Node {
        Node::from_json(&json)
    }

    #[test]
    fn test_from_node_object() {
        let schema = Schema::from_node(&node(serde_json::json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "port": {"type": "integer", "default": 80}
            },
            "required": ["name"]
        })))
        .unwrap();

        let Schema::Object(object) = &schema else {
            panic!("expected object schema, got {:?}", schema);
        };
        assert_eq!(object.required, vec!["name"]);
        let names: Vec<_> = object.properties.keys().cloned().collect();
        assert_eq!(names, vec!["name", "port"]);
        assert_eq!(object.properties["port"].type_name(), "integer");
        assert!(object.properties["port"].annotations().default.is_some());
    }

    #[test]
    fn test_from_node_shorthands() {
        assert_eq!(
            Schema::from_node(&Node::string("integer")).unwrap().type_name(),
            "integer"
        );
        let ty = Node::type_node(Rc::new(Schema::boolean()));
        assert_eq!(Schema::from_node(&ty).unwrap().type_name(), "boolean");
        assert!(Schema::from_node(&Node::string("widget")).is_err());
        assert!(Schema::from_node(&Node::int(3)).is_err());
    }

    #[test]
    fn test_from_node_infers_type() {
        let schema =
            Schema::from_node(&node(serde_json::json!({"properties": {"a": "string"}}))).unwrap();
        assert_eq!(schema.type_name(), "object");

        let schema = Schema::from_node(&node(serde_json::json!({"items": "integer"}))).unwrap();
        assert_eq!(schema.type_name(), "array");

        let schema =
            Schema::from_node(&node(serde_json::json!({"oneOf": ["integer", "string"]}))).unwrap();
        assert_eq!(schema.type_name(), "oneOf");

        let schema = Schema::from_node(&node(serde_json::json!({}))).unwrap();
        assert_eq!(schema.type_name(), "any");
    }

    #[test]
    fn test_from_node_function() {
        let schema = Schema::from_node(&node(serde_json::json!({
            "type": "function",
            "arguments": ["integer", {"type": "string"}],
            "returns": "boolean"
        })))
        .unwrap();
        let Schema::Function(function) = schema else {
            panic!("expected function schema");
        };
        assert_eq!(function.arguments.len(), 2);
        assert_eq!(function.returns.unwrap().type_name(), "boolean");
    }

    #[test]
    fn test_from_node_patch_annotations() {
        let schema = Schema::from_node(&node(serde_json::json!({
            "type": "array",
            "items": {"type": "object"},
            "patchStrategy": "merge",
            "patchMergeKey": "name"
        })))
        .unwrap();
        assert_eq!(schema.annotations().patch_strategy, PatchStrategy::Merge);
        assert_eq!(schema.annotations().patch_merge_key.as_deref(), Some("name"));
    }

    #[test]
    fn test_from_node_additional_properties() {
        let schema = Schema::from_node(&node(serde_json::json!({
            "type": "object",
            "additionalProperties": false
        })))
        .unwrap();
        assert!(matches!(
            schema,
            Schema::Object(ObjectSchema {
                additional_properties: AdditionalProperties::Denied,
                ..
            })
        ));
    }

    #[test]
    fn test_from_node_errors() {
        let err = Schema::from_node(&node(serde_json::json!({"type": 3}))).unwrap_err();
        assert!(err.to_string().contains("'type' must be a string"));
        let err =
            Schema::from_node(&node(serde_json::json!({"type": "string", "minLength": -1})))
                .unwrap_err();
        assert!(err.to_string().contains("minLength"));
    }
}
