//! Schema type definitions
//!
//! Each schema type struct contains:
//! - annotations: metadata shared by every schema (id, description, default,
//!   patch hints)
//! - type-specific fields: constraints checked during validation

use indexmap::IndexMap;
use std::rc::Rc;

use super::Schema;
use crate::node::Node;

/// How arrays are combined when one value is merged onto another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchStrategy {
    /// The incoming array replaces the existing one
    #[default]
    Replace,
    /// Arrays are combined, matching elements by the merge key if one is set
    Merge,
}

impl PatchStrategy {
    /// Parse a strategy as written in schemas (`merge`, `replace`,
    /// `merge,retainKeys`, ...).
    pub fn parse(value: &str) -> PatchStrategy {
        if value.split(',').any(|part| part.trim() == "merge") {
            PatchStrategy::Merge
        } else {
            PatchStrategy::Replace
        }
    }
}

/// Annotations that can be attached to any schema
#[derive(Debug, Clone, Default)]
pub struct SchemaAnnotations {
    /// Schema identifier, also used as its display name
    pub id: Option<String>,

    pub description: Option<String>,

    /// Value filled in for an absent property
    pub default: Option<Node>,

    pub patch_strategy: PatchStrategy,

    /// Property that identifies array elements under the merge strategy
    pub patch_merge_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AnySchema {
    pub annotations: SchemaAnnotations,
}

#[derive(Debug, Clone, Default)]
pub struct NullSchema {
    pub annotations: SchemaAnnotations,
}

#[derive(Debug, Clone, Default)]
pub struct BooleanSchema {
    pub annotations: SchemaAnnotations,
}

/// Number type schema (integer or float)
#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    pub annotations: SchemaAnnotations,
    /// Only integers are accepted
    pub integer: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

/// String type schema
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    pub annotations: SchemaAnnotations,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    /// `int-or-string` also accepts integers, converting them to strings
    pub format: Option<String>,
}

impl StringSchema {
    pub fn is_int_or_string(&self) -> bool {
        self.format.as_deref() == Some(INT_OR_STRING)
    }
}

pub const INT_OR_STRING: &str = "int-or-string";

#[derive(Debug, Clone, Default)]
pub struct ArraySchema {
    pub annotations: SchemaAnnotations,
    pub items: Option<Rc<Schema>>,
}

/// What an object does with properties it does not declare.
#[derive(Debug, Clone, Default)]
pub enum AdditionalProperties {
    #[default]
    Allowed,
    Denied,
    Schema(Rc<Schema>),
}

#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    pub annotations: SchemaAnnotations,
    pub properties: IndexMap<String, Rc<Schema>>,
    pub required: Vec<String>,
    pub additional_properties: AdditionalProperties,
}

/// The type of a lambda: argument types and an optional return type.
#[derive(Debug, Clone, Default)]
pub struct FunctionSchema {
    pub annotations: SchemaAnnotations,
    pub arguments: Vec<Rc<Schema>>,
    pub returns: Option<Rc<Schema>>,
}

/// Matches if any alternative does. The first alternative that validates
/// is the one whose conversions are kept.
#[derive(Debug, Clone, Default)]
pub struct OneOfSchema {
    pub annotations: SchemaAnnotations,
    pub schemas: Vec<Rc<Schema>>,
}
