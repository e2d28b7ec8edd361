//! Schema-guided deep merge (Kubernetes strategic merge patch).

use crate::error::{EvaluationError, Result};
use crate::node::{Attr, Node, Value};
use crate::schema::{PatchStrategy, Schema};

/// Merge `src` onto `dst`.
///
/// - map onto map: keys of both sides are kept, keys present in both are
///   merged recursively with the property's schema. The result takes the
///   schema attached to `src`.
/// - array onto array: the schema's patch strategy decides. `replace`
///   (the default) yields `src`. `merge` appends `src` to `dst`, or with a
///   merge key, merges elements whose key values match and appends the
///   rest.
/// - anything else: `src` wins.
pub fn deep_merge(dst: Node, src: Node, schema: Option<&Schema>) -> Result<Node> {
    match (dst.value, src.value) {
        (Value::Map(mut dst_map), Value::Map(src_map)) => {
            for (key, value) in src_map {
                let property = schema.and_then(|s| s.property(&key)).map(|s| &**s);
                match dst_map.get_mut(&key) {
                    Some(existing) => {
                        let old = std::mem::replace(existing, Node::null());
                        *existing = deep_merge(old, value, property)?;
                    }
                    None => {
                        dst_map.insert(key, value);
                    }
                }
            }
            Ok(Node {
                value: Value::Map(dst_map),
                tag: src.tag,
                anchor: None,
                attr: merged_attr(dst.attr, src.attr),
                is_document_root: false,
                schema: src.schema,
            })
        }
        (Value::Array(dst_items), Value::Array(src_items)) => {
            let annotations = schema.map(Schema::annotations);
            let strategy = annotations.map(|a| a.patch_strategy).unwrap_or_default();
            let items = match strategy {
                PatchStrategy::Replace => src_items,
                PatchStrategy::Merge => match annotations.and_then(|a| a.patch_merge_key.as_deref())
                {
                    None => dst_items.into_iter().chain(src_items).collect(),
                    Some(key) => {
                        let items_schema = schema.and_then(Schema::items).map(|s| &**s);
                        merge_by_key(dst_items, src_items, key, items_schema)?
                    }
                },
            };
            Ok(Node {
                value: Value::Array(items),
                tag: src.tag,
                anchor: None,
                attr: merged_attr(dst.attr, src.attr),
                is_document_root: false,
                schema: src.schema,
            })
        }
        (_, value) => Ok(Node {
            value,
            tag: src.tag,
            anchor: None,
            attr: src.attr,
            is_document_root: src.is_document_root,
            schema: src.schema,
        }),
    }
}

fn merge_by_key(
    mut dst: Vec<Node>,
    src: Vec<Node>,
    key: &str,
    items_schema: Option<&Schema>,
) -> Result<Vec<Node>> {
    for element in src {
        let Some(wanted) = element.get(key).map(Node::to_native) else {
            return Err(EvaluationError::at(
                &element,
                format!("merge key '{}' is missing from list element", key),
            ));
        };
        let position = dst
            .iter()
            .position(|existing| existing.get(key).map(Node::to_native).as_ref() == Some(&wanted));
        match position {
            Some(index) => {
                let existing = std::mem::replace(&mut dst[index], Node::null());
                dst[index] = deep_merge(existing, element, items_schema)?;
            }
            None => dst.push(element),
        }
    }
    Ok(dst)
}

fn merged_attr(mut dst: Attr, src: Attr) -> Attr {
    dst.sources.extend(src.sources);
    if !src.comments.is_empty() {
        dst.comments = src.comments;
    }
    if !src.key_comments.is_empty() {
        dst.key_comments = src.key_comments;
    }
    dst
}
