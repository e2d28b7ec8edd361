//! Schema types for typing and validating values.
//!
//! A [`Schema`] is a simplified JSON Schema: primitive kinds with
//! constraints, objects, arrays, functions and `oneOf`. Schemas come from
//! three places:
//! - `schema` calls in a program ([`Schema::from_node`])
//! - OpenAPI documents such as the Kubernetes swagger
//!   ([`Schema::from_json`])
//! - the primitive types bound in every environment
//!
//! Validation may rewrite the value it checks: an integer accepted by an
//! `int-or-string` schema becomes a string.

mod defaults;
mod equals;
mod error;
mod openapi;
mod parse;
mod types;
mod validate;

pub use defaults::interpolate_defaults;
pub use equals::structural_equals;
pub use error::{
    InstancePath, PathSegment, SchemaError, SchemaResult, ValidationError, ValidationErrorKind,
    ValidationResult,
};
pub use openapi::{Gvk, OpenApiDefinitions};
pub use types::{
    AdditionalProperties, AnySchema, ArraySchema, BooleanSchema, FunctionSchema, INT_OR_STRING,
    NullSchema, NumberSchema, ObjectSchema, OneOfSchema, PatchStrategy, SchemaAnnotations,
    StringSchema,
};
pub use validate::{cast, validate};

use std::rc::Rc;

/// The main schema enum representing all possible schema types
#[derive(Debug, Clone)]
pub enum Schema {
    /// Any value (no validation)
    Any(AnySchema),
    Null(NullSchema),
    Boolean(BooleanSchema),
    /// Integers, or integers and floats
    Number(NumberSchema),
    String(StringSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
    /// A lambda signature
    Function(FunctionSchema),
    /// Any of the alternatives
    OneOf(OneOfSchema),
}

impl Schema {
    pub fn any() -> Schema {
        Schema::Any(AnySchema::default())
    }

    pub fn null() -> Schema {
        Schema::Null(NullSchema::default())
    }

    pub fn boolean() -> Schema {
        Schema::Boolean(BooleanSchema::default())
    }

    pub fn integer() -> Schema {
        Schema::Number(NumberSchema {
            integer: true,
            ..Default::default()
        })
    }

    pub fn number() -> Schema {
        Schema::Number(NumberSchema::default())
    }

    pub fn string() -> Schema {
        Schema::String(StringSchema::default())
    }

    pub fn array(items: Option<Rc<Schema>>) -> Schema {
        Schema::Array(ArraySchema {
            items,
            ..Default::default()
        })
    }

    pub fn object() -> Schema {
        Schema::Object(ObjectSchema::default())
    }

    /// Get the annotations for this schema
    pub fn annotations(&self) -> &SchemaAnnotations {
        match self {
            Schema::Any(s) => &s.annotations,
            Schema::Null(s) => &s.annotations,
            Schema::Boolean(s) => &s.annotations,
            Schema::Number(s) => &s.annotations,
            Schema::String(s) => &s.annotations,
            Schema::Array(s) => &s.annotations,
            Schema::Object(s) => &s.annotations,
            Schema::Function(s) => &s.annotations,
            Schema::OneOf(s) => &s.annotations,
        }
    }

    pub fn annotations_mut(&mut self) -> &mut SchemaAnnotations {
        match self {
            Schema::Any(s) => &mut s.annotations,
            Schema::Null(s) => &mut s.annotations,
            Schema::Boolean(s) => &mut s.annotations,
            Schema::Number(s) => &mut s.annotations,
            Schema::String(s) => &mut s.annotations,
            Schema::Array(s) => &mut s.annotations,
            Schema::Object(s) => &mut s.annotations,
            Schema::Function(s) => &mut s.annotations,
            Schema::OneOf(s) => &mut s.annotations,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Schema {
        self.annotations_mut().id = Some(id.into());
        self
    }

    /// Get a human-readable name for this schema type
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Any(_) => "any",
            Schema::Null(_) => "null",
            Schema::Boolean(_) => "boolean",
            Schema::Number(s) if s.integer => "integer",
            Schema::Number(_) => "number",
            Schema::String(_) => "string",
            Schema::Array(_) => "array",
            Schema::Object(_) => "object",
            Schema::Function(_) => "function",
            Schema::OneOf(_) => "oneOf",
        }
    }

    /// The id if the schema has one, otherwise its type name.
    pub fn name(&self) -> &str {
        self.annotations().id.as_deref().unwrap_or(self.type_name())
    }

    /// Schema of a named property, if this is an object schema declaring it.
    pub fn property(&self, name: &str) -> Option<&Rc<Schema>> {
        match self {
            Schema::Object(s) => s.properties.get(name),
            _ => None,
        }
    }

    /// Schema of array elements, if this is an array schema with one.
    pub fn items(&self) -> Option<&Rc<Schema>> {
        match self {
            Schema::Array(s) => s.items.as_ref(),
            _ => None,
        }
    }

    /// The primitive types bound by name in every environment.
    pub fn primitives() -> Vec<(&'static str, Schema)> {
        vec![
            ("string", Schema::string()),
            ("integer", Schema::integer()),
            ("number", Schema::number()),
            ("boolean", Schema::boolean()),
            ("null", Schema::null()),
            ("any", Schema::any()),
            ("object", Schema::object()),
            ("array", Schema::array(None)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_type_name() {
        assert_eq!(Schema::integer().type_name(), "integer");
        assert_eq!(Schema::number().type_name(), "number");
        assert_eq!(Schema::array(None).type_name(), "array");
        assert_eq!(Schema::any().type_name(), "any");
    }

    #[test]
    fn test_schema_name_prefers_id() {
        assert_eq!(Schema::object().name(), "object");
        assert_eq!(
            Schema::object().with_id("io.k8s.api.core.v1.Pod").name(),
            "io.k8s.api.core.v1.Pod"
        );
    }

    #[test]
    fn test_patch_strategy_parse() {
        assert_eq!(PatchStrategy::parse("merge"), PatchStrategy::Merge);
        assert_eq!(
            PatchStrategy::parse("merge,retainKeys"),
            PatchStrategy::Merge
        );
        assert_eq!(PatchStrategy::parse("retainKeys"), PatchStrategy::Replace);
        assert_eq!(PatchStrategy::parse("replace"), PatchStrategy::Replace);
    }
}
