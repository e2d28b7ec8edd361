// Structural equality of schemas

use super::{AdditionalProperties, Schema};

/// Whether two schemas describe the same shape.
///
/// Primitive schemas of the same kind are equal regardless of their
/// constraints. Objects must declare the same property names with equal
/// property schemas, arrays equal item schemas, functions equal argument
/// lists and return types, and `oneOf` equal alternatives in order.
pub fn structural_equals(a: &Schema, b: &Schema) -> bool {
    match (a, b) {
        (Schema::Any(_), Schema::Any(_))
        | (Schema::Null(_), Schema::Null(_))
        | (Schema::Boolean(_), Schema::Boolean(_))
        | (Schema::String(_), Schema::String(_)) => true,
        (Schema::Number(x), Schema::Number(y)) => x.integer == y.integer,
        (Schema::Array(x), Schema::Array(y)) => {
            optional_equals(x.items.as_deref(), y.items.as_deref())
        }
        (Schema::Object(x), Schema::Object(y)) => {
            x.properties.len() == y.properties.len()
                && x.properties.iter().all(|(name, schema)| {
                    y.properties
                        .get(name)
                        .is_some_and(|other| structural_equals(schema, other))
                })
                && additional_equals(&x.additional_properties, &y.additional_properties)
        }
        (Schema::Function(x), Schema::Function(y)) => {
            x.arguments.len() == y.arguments.len()
                && x
                    .arguments
                    .iter()
                    .zip(&y.arguments)
                    .all(|(p, q)| structural_equals(p, q))
                && optional_equals(x.returns.as_deref(), y.returns.as_deref())
        }
        (Schema::OneOf(x), Schema::OneOf(y)) => {
            x.schemas.len() == y.schemas.len()
                && x
                    .schemas
                    .iter()
                    .zip(&y.schemas)
                    .all(|(p, q)| structural_equals(p, q))
        }
        _ => false,
    }
}

fn optional_equals(a: Option<&Schema>, b: Option<&Schema>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => structural_equals(a, b),
        _ => false,
    }
}

fn additional_equals(a: &AdditionalProperties, b: &AdditionalProperties) -> bool {
    match (a, b) {
        (AdditionalProperties::Allowed, AdditionalProperties::Allowed)
        | (AdditionalProperties::Denied, AdditionalProperties::Denied) => true,
        (AdditionalProperties::Schema(a), AdditionalProperties::Schema(b)) => {
            structural_equals(a, b)
        }
        _ => false,
    }
}
