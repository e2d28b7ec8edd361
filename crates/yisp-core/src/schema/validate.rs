// Validation of nodes against schemas

use std::rc::Rc;

use regex::Regex;
use yisp_source_map::SourceInfo;

use super::error::{
    InstancePath, PathSegment, ValidationError, ValidationErrorKind, ValidationResult,
};
use super::{
    AdditionalProperties, ArraySchema, FunctionSchema, NumberSchema, ObjectSchema, OneOfSchema,
    Schema, StringSchema, interpolate_defaults, structural_equals,
};
use crate::node::{Node, Value};

/// Validate a node against a schema.
///
/// The node may be rewritten: integers accepted by an `int-or-string`
/// schema become strings. With `allow_partial`, missing required
/// properties are not reported, which is how patches are checked.
pub fn validate(node: &mut Node, schema: &Schema, allow_partial: bool) -> ValidationResult<()> {
    let mut context = ValidationContext::new(allow_partial);
    validate_generic(node, schema, &mut context)
}

/// Fill in defaults, validate, and attach the schema to the node.
pub fn cast(mut node: Node, schema: &Rc<Schema>) -> ValidationResult<Node> {
    interpolate_defaults(&mut node, schema);
    validate(&mut node, schema, false)?;
    node.schema = Some(schema.clone());
    Ok(node)
}

/// Validation context tracks state during validation
struct ValidationContext {
    /// Current instance path (e.g., ["spec", "replicas"])
    instance_path: InstancePath,
    allow_partial: bool,
}

impl ValidationContext {
    fn new(allow_partial: bool) -> Self {
        Self {
            instance_path: InstancePath::new(),
            allow_partial,
        }
    }

    fn error(&self, kind: ValidationErrorKind, location: Option<&SourceInfo>) -> ValidationError {
        ValidationError::new(kind, self.instance_path.clone()).with_location(location)
    }

    fn with_instance_path<F, R>(&mut self, segment: PathSegment, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.instance_path.push(segment);
        let result = f(self);
        self.instance_path.pop();
        result
    }
}

fn validate_generic(
    node: &mut Node,
    schema: &Schema,
    context: &mut ValidationContext,
) -> ValidationResult<()> {
    match schema {
        Schema::Any(_) => Ok(()),
        Schema::Null(_) => expect_kind(node, matches!(node.value, Value::Null), "null", context),
        Schema::Boolean(_) => {
            expect_kind(node, matches!(node.value, Value::Bool(_)), "boolean", context)
        }
        Schema::Number(s) => validate_number(node, s, context),
        Schema::String(s) => validate_string(node, s, context),
        Schema::Array(s) => validate_array(node, s, context),
        Schema::Object(s) => validate_object(node, s, context),
        Schema::Function(s) => validate_function(node, s, context),
        Schema::OneOf(s) => validate_one_of(node, s, context),
    }
}

fn expect_kind(
    node: &Node,
    ok: bool,
    expected: &str,
    context: &ValidationContext,
) -> ValidationResult<()> {
    if ok {
        Ok(())
    } else {
        Err(type_mismatch(node, expected, context))
    }
}

fn type_mismatch(node: &Node, expected: &str, context: &ValidationContext) -> ValidationError {
    context.error(
        ValidationErrorKind::TypeMismatch {
            expected: expected.to_string(),
            got: node.kind().name().to_string(),
        },
        node.location(),
    )
}

fn validate_number(
    node: &Node,
    schema: &NumberSchema,
    context: &mut ValidationContext,
) -> ValidationResult<()> {
    let expected = if schema.integer { "integer" } else { "number" };
    let num = match node.value {
        Value::Int(i) => i as f64,
        Value::Float(f) if !schema.integer => f,
        _ => return Err(type_mismatch(node, expected, context)),
    };

    let out_of_range = |minimum, maximum, exclusive_minimum, exclusive_maximum| {
        context.error(
            ValidationErrorKind::NumberOutOfRange {
                value: num,
                minimum,
                maximum,
                exclusive_minimum,
                exclusive_maximum,
            },
            node.location(),
        )
    };

    if let Some(min) = schema.minimum
        && num < min
    {
        return Err(out_of_range(Some(min), None, None, None));
    }
    if let Some(max) = schema.maximum
        && num > max
    {
        return Err(out_of_range(None, Some(max), None, None));
    }
    if let Some(min) = schema.exclusive_minimum
        && num <= min
    {
        return Err(out_of_range(None, None, Some(min), None));
    }
    if let Some(max) = schema.exclusive_maximum
        && num >= max
    {
        return Err(out_of_range(None, None, None, Some(max)));
    }

    if let Some(multiple) = schema.multiple_of
        && !is_multiple_of(num, multiple)
    {
        return Err(context.error(
            ValidationErrorKind::NumberNotMultipleOf {
                value: num,
                multiple_of: multiple,
            },
            node.location(),
        ));
    }

    Ok(())
}

/// Whether `value / multiple` is a whole number, within a tolerance
/// relative to the quotient so that `0.3` counts as a multiple of `0.1`.
fn is_multiple_of(value: f64, multiple: f64) -> bool {
    if multiple == 0.0 {
        return false;
    }
    let quotient = value / multiple;
    (quotient - quotient.round()).abs() <= 1e-9 * quotient.abs().max(1.0)
}

fn validate_string(
    node: &mut Node,
    schema: &StringSchema,
    context: &mut ValidationContext,
) -> ValidationResult<()> {
    if let Value::Int(i) = node.value
        && schema.is_int_or_string()
    {
        node.value = Value::String(i.to_string());
        return Ok(());
    }

    let Value::String(s) = &node.value else {
        return Err(type_mismatch(node, "string", context));
    };

    let length = s.chars().count();
    if let Some(min) = schema.min_length
        && length < min
    {
        return Err(context.error(
            ValidationErrorKind::StringLengthInvalid {
                length,
                min_length: Some(min),
                max_length: None,
            },
            node.location(),
        ));
    }
    if let Some(max) = schema.max_length
        && length > max
    {
        return Err(context.error(
            ValidationErrorKind::StringLengthInvalid {
                length,
                min_length: None,
                max_length: Some(max),
            },
            node.location(),
        ));
    }

    if let Some(pattern) = &schema.pattern {
        let regex = Regex::new(pattern).map_err(|e| {
            context.error(
                ValidationErrorKind::Other {
                    message: format!("Invalid pattern '{}': {}", pattern, e),
                },
                node.location(),
            )
        })?;
        if !regex.is_match(s) {
            return Err(context.error(
                ValidationErrorKind::StringPatternMismatch {
                    value: s.clone(),
                    pattern: pattern.clone(),
                },
                node.location(),
            ));
        }
    }

    Ok(())
}

fn validate_array(
    node: &mut Node,
    schema: &ArraySchema,
    context: &mut ValidationContext,
) -> ValidationResult<()> {
    let Value::Array(items) = &mut node.value else {
        return Err(type_mismatch(node, "array", context));
    };

    if let Some(item_schema) = &schema.items {
        for (i, item) in items.iter_mut().enumerate() {
            context.with_instance_path(PathSegment::Index(i), |ctx| {
                validate_generic(item, item_schema, ctx)
            })?;
        }
    }
    Ok(())
}

/// Declared properties present in the map must validate. A property set to
/// null counts as absent. Undeclared properties other than `$schema` are
/// checked against `additionalProperties`.
fn validate_object(
    node: &mut Node,
    schema: &ObjectSchema,
    context: &mut ValidationContext,
) -> ValidationResult<()> {
    let location = node.location().cloned();
    let Value::Map(map) = &mut node.value else {
        return Err(type_mismatch(node, "object", context));
    };

    if !context.allow_partial {
        for required in &schema.required {
            if map.get(required).is_none_or(Node::is_null) {
                return Err(context.error(
                    ValidationErrorKind::MissingRequiredProperty {
                        property: required.clone(),
                    },
                    location.as_ref(),
                ));
            }
        }
    }

    for (key, value) in map.iter_mut() {
        if key == "$schema" {
            continue;
        }
        match schema.properties.get(key) {
            Some(property) => {
                if value.is_null() && !matches!(**property, Schema::Null(_) | Schema::Any(_)) {
                    continue;
                }
                context.with_instance_path(PathSegment::Key(key.clone()), |ctx| {
                    validate_generic(value, property, ctx)
                })?;
            }
            None => match &schema.additional_properties {
                AdditionalProperties::Allowed => {}
                AdditionalProperties::Denied => {
                    return Err(context.error(
                        ValidationErrorKind::UnknownProperty {
                            property: key.clone(),
                        },
                        value.location().or(location.as_ref()),
                    ));
                }
                AdditionalProperties::Schema(additional) => {
                    context.with_instance_path(PathSegment::Key(key.clone()), |ctx| {
                        validate_generic(value, additional, ctx)
                    })?;
                }
            },
        }
    }

    Ok(())
}

/// A lambda matches a function type when its parameter count is the same
/// and each declared type is structurally equal. Undeclared types count as
/// `any`.
fn validate_function(
    node: &Node,
    schema: &FunctionSchema,
    context: &mut ValidationContext,
) -> ValidationResult<()> {
    let Value::Lambda(lambda) = &node.value else {
        return Err(type_mismatch(node, "function", context));
    };

    if lambda.params.len() != schema.arguments.len() {
        return Err(context.error(
            ValidationErrorKind::ArityMismatch {
                expected: schema.arguments.len(),
                got: lambda.params.len(),
            },
            node.location(),
        ));
    }

    let any = Schema::any();
    for (param, expected) in lambda.params.iter().zip(&schema.arguments) {
        let declared = param.schema.as_deref().unwrap_or(&any);
        if !structural_equals(declared, expected) {
            return Err(context.error(
                ValidationErrorKind::SignatureMismatch {
                    detail: format!(
                        "argument '{}' is {}, expected {}",
                        param.name,
                        declared.name(),
                        expected.name()
                    ),
                },
                node.location(),
            ));
        }
    }

    let declared = lambda.returns.as_deref().unwrap_or(&any);
    let expected = schema.returns.as_deref().unwrap_or(&any);
    if !structural_equals(declared, expected) {
        return Err(context.error(
            ValidationErrorKind::SignatureMismatch {
                detail: format!(
                    "returns {}, expected {}",
                    declared.name(),
                    expected.name()
                ),
            },
            node.location(),
        ));
    }

    Ok(())
}

/// Try each alternative on a copy of the node. The first one that passes
/// wins, and its conversions are kept.
fn validate_one_of(
    node: &mut Node,
    schema: &OneOfSchema,
    context: &mut ValidationContext,
) -> ValidationResult<()> {
    let mut errors = Vec::new();
    for alternative in &schema.schemas {
        let mut candidate = node.clone();
        match validate_generic(&mut candidate, alternative, context) {
            Ok(()) => {
                *node = candidate;
                return Ok(());
            }
            Err(e) => errors.push(e),
        }
    }
    Err(context.error(
        ValidationErrorKind::NoMatchingAlternative { errors },
        node.location(),
    ))
}
