//! Build [`Node`] trees from the YAML document model.

use crate::error::{EvaluationError, Result};
use crate::node::{Attr, Node, Value};
use indexmap::IndexMap;
use yisp_yaml::{Scalar, YamlEntry, YamlKind, YamlNode};

/// Prefix of map keys that splat their value into the enclosing map.
pub const MERGE_KEY_PREFIX: &str = "<<";

/// Convert a parsed YAML node.
///
/// Aliases become symbols. Every `<<` key of a mapping is renamed to
/// `<<#n` so repeated merge keys survive in the ordered map. Comments and
/// style written on a mapping key are kept on the value's [`Attr`].
pub fn from_yaml(yaml: YamlNode) -> Result<Node> {
    let mut attr = Attr::at(yaml.source_info);
    attr.comments = yaml.comments;
    attr.style = yaml.style;

    let value = match yaml.kind {
        YamlKind::Scalar(scalar) => scalar_value(scalar),
        YamlKind::Alias(name) => Value::Symbol(name),
        YamlKind::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<Result<Vec<_>>>()?,
        ),
        YamlKind::Mapping(entries) => Value::Map(mapping(entries)?),
    };

    Ok(Node {
        value,
        tag: yaml.tag,
        anchor: yaml.anchor,
        attr,
        is_document_root: false,
        schema: None,
    })
}

fn scalar_value(scalar: Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(b),
        Scalar::Int(i) => Value::Int(i),
        Scalar::Float(f) => Value::Float(f),
        Scalar::String(s) => Value::String(s),
    }
}

fn mapping(entries: Vec<YamlEntry>) -> Result<IndexMap<String, Node>> {
    let mut map = IndexMap::with_capacity(entries.len());
    let mut merges = 0;
    for YamlEntry { key, value } in entries {
        let mut name = key_text(&key)?;
        if name == MERGE_KEY_PREFIX {
            name = format!("{}#{}", MERGE_KEY_PREFIX, merges);
            merges += 1;
        }
        let mut value = from_yaml(value)?;
        value.attr.key_comments = key.comments;
        value.attr.key_style = key.style;
        map.insert(name, value);
    }
    Ok(map)
}

fn key_text(key: &YamlNode) -> Result<String> {
    match &key.kind {
        YamlKind::Scalar(Scalar::String(s)) => Ok(s.clone()),
        YamlKind::Scalar(Scalar::Null) => Ok("null".to_string()),
        YamlKind::Scalar(Scalar::Bool(b)) => Ok(b.to_string()),
        YamlKind::Scalar(Scalar::Int(i)) => Ok(i.to_string()),
        YamlKind::Scalar(Scalar::Float(f)) => Ok(f.to_string()),
        YamlKind::Alias(_) | YamlKind::Sequence(_) | YamlKind::Mapping(_) => {
            Err(EvaluationError::new(
                "mapping keys must be scalars",
                Some(&key.source_info),
            ))
        }
    }
}

/// Whether `key` is a renamed merge key.
pub fn is_merge_key(key: &str) -> bool {
    key.starts_with(MERGE_KEY_PREFIX)
}
