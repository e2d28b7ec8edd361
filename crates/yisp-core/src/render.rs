//! Rendering evaluated nodes as output documents.

use yisp_yaml::{Scalar, YamlEntry, YamlKind, YamlNode};

use crate::error::{EvaluationError, Result};
use crate::node::{Node, Value};
use crate::schema::validate;

const SCHEMA_KEY: &str = "$schema";

/// Re-check every node that has a schema attached.
///
/// Validation may rewrite values (int-or-string), so this runs on the tree
/// that is about to be rendered.
pub fn verify(node: &mut Node) -> Result<()> {
    if let Some(schema) = node.schema.clone() {
        validate(node, &schema, false).map_err(|err| {
            EvaluationError::validation(
                format!("value does not satisfy {}", schema.name()),
                err,
                node.location(),
            )
        })?;
    }
    match &mut node.value {
        Value::Array(items) => items.iter_mut().try_for_each(verify),
        Value::Map(map) => map.values_mut().try_for_each(verify),
        _ => Ok(()),
    }
}

/// The output documents for an evaluated tree. A document root yields one
/// document per item, with nested document roots flattened one level.
pub fn documents(node: &Node) -> Vec<YamlNode> {
    match &node.value {
        Value::Array(items) if node.is_document_root => {
            let mut documents = Vec::with_capacity(items.len());
            for item in items {
                match &item.value {
                    Value::Array(inner) if item.is_document_root => {
                        documents.extend(inner.iter().map(to_yaml));
                    }
                    _ => documents.push(to_yaml(item)),
                }
            }
            documents
        }
        _ => vec![to_yaml(node)],
    }
}

/// Convert a node to the YAML document model. Tags and anchors are not
/// carried over, `$schema` keys are dropped, and values with no data
/// representation become placeholder strings.
pub fn to_yaml(node: &Node) -> YamlNode {
    let kind = match &node.value {
        Value::Null => YamlKind::Scalar(Scalar::Null),
        Value::Bool(b) => YamlKind::Scalar(Scalar::Bool(*b)),
        Value::Int(i) => YamlKind::Scalar(Scalar::Int(*i)),
        Value::Float(f) => YamlKind::Scalar(Scalar::Float(*f)),
        Value::String(s) => YamlKind::Scalar(Scalar::String(s.clone())),
        Value::Array(items) => YamlKind::Sequence(items.iter().map(to_yaml).collect()),
        Value::Map(map) => YamlKind::Mapping(
            map.iter()
                .filter(|(key, _)| key.as_str() != SCHEMA_KEY)
                .map(|(key, value)| {
                    let key_node = YamlNode::string(key.clone())
                        .with_style(value.attr.key_style)
                        .with_comments(value.attr.key_comments.clone());
                    YamlEntry::new(key_node, to_yaml(value))
                })
                .collect(),
        ),
        Value::Symbol(_) | Value::Parameter(_) | Value::Lambda(_) | Value::Type(_) => {
            YamlKind::Scalar(Scalar::String(node.placeholder()))
        }
    };

    let mut yaml = YamlNode::new(kind, node.location().cloned().unwrap_or_default())
        .with_comments(node.attr.comments.clone());
    yaml.style = match &node.value {
        Value::Symbol(_) | Value::Parameter(_) | Value::Lambda(_) | Value::Type(_) => {
            Default::default()
        }
        _ => node.attr.style,
    };
    yaml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{INT_OR_STRING, ObjectSchema, Schema, StringSchema};
    use indexmap::IndexMap;
    use serde_json::json;
    use std::rc::Rc;
    use yisp_yaml::{emit_documents, to_json};

    #[test]
    fn test_verify_rewrites_int_or_string() {
        let port = Schema::String(StringSchema {
            format: Some(INT_OR_STRING.to_string()),
            ..Default::default()
        });
        let schema = Schema::Object(ObjectSchema {
            properties: [("port".to_string(), Rc::new(port))].into_iter().collect(),
            ..Default::default()
        });
        let mut node = Node::from_json(&json!({"port": 8080})).with_schema(Rc::new(schema));
        verify(&mut node).unwrap();
        assert_eq!(node.to_json(), json!({"port": "8080"}));
    }

    #[test]
    fn test_verify_reports_nested_failures() {
        let inner = Node::string("x").with_schema(Rc::new(Schema::integer()));
        let mut map = IndexMap::new();
        map.insert("n".to_string(), inner);
        let mut node = Node::map(map);
        let err = verify(&mut node).unwrap_err();
        assert_eq!(err.message, "value does not satisfy integer");
    }

    #[test]
    fn test_schema_keys_and_placeholders() {
        let mut map = IndexMap::new();
        map.insert("$schema".to_string(), Node::string("Thing"));
        map.insert("f".to_string(), Node::symbol("g"));
        map.insert("t".to_string(), Node::type_node(Rc::new(Schema::string())));
        let yaml = to_yaml(&Node::map(map));
        assert_eq!(to_json(&yaml), json!({"f": "<symbol g>", "t": "<type string>"}));
    }

    #[test]
    fn test_document_roots_flatten_one_level() {
        let inner = Node::document_root(vec![Node::int(2), Node::int(3)]);
        let root = Node::document_root(vec![Node::int(1), inner]);
        insta::assert_snapshot!(emit_documents(&documents(&root)), @r"
        1
        ---
        2
        ---
        3
        ");
    }

    #[test]
    fn test_plain_array_is_one_document() {
        let node = Node::array(vec![Node::int(1), Node::int(2)]);
        assert_eq!(documents(&node).len(), 1);
    }
}
