//! Schema loading from JSON Schema and OpenAPI documents
//!
//! Kubernetes publishes its types as an OpenAPI v2 document whose
//! `definitions` reference each other through `$ref`. References are
//! resolved while converting, so the resulting [`Schema`] graph is complete
//! before any validation runs. A reference cycle resolves to `any` at the
//! point where it closes.
//!
//! Kubernetes extensions honored:
//! - `x-kubernetes-int-or-string`
//! - `x-kubernetes-patch-strategy` / `x-kubernetes-patch-merge-key`
//! - `x-kubernetes-group-version-kind` (see [`OpenApiDefinitions::gvk_index`])

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::rc::Rc;

use super::error::{SchemaError, SchemaResult};
use super::{
    AdditionalProperties, ArraySchema, BooleanSchema, INT_OR_STRING, NullSchema, NumberSchema,
    ObjectSchema, OneOfSchema, PatchStrategy, Schema, SchemaAnnotations, StringSchema,
};
use crate::node::Node;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// The named definitions of an OpenAPI document.
#[derive(Debug, Clone, Default)]
pub struct OpenApiDefinitions {
    definitions: Map<String, Value>,
}

/// A Kubernetes group/version/kind triple. The core group is `""`.
pub type Gvk = (String, String, String);

impl OpenApiDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect definitions from an OpenAPI v2 (`definitions`) or v3
    /// (`components.schemas`) document, or a JSON Schema with
    /// `definitions`.
    pub fn from_document(document: &Value) -> Self {
        let mut definitions = Self::new();
        definitions.extend(document);
        definitions
    }

    /// Add the definitions of another document. Later definitions replace
    /// earlier ones with the same name.
    pub fn extend(&mut self, document: &Value) {
        let sections = [
            document.get("definitions"),
            document.get("components").and_then(|c| c.get("schemas")),
        ];
        for section in sections.into_iter().flatten() {
            if let Some(map) = section.as_object() {
                for (name, schema) in map {
                    self.definitions.insert(name.clone(), schema.clone());
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolve a definition by name into a complete schema whose id is the
    /// definition name.
    pub fn resolve(&self, name: &str) -> SchemaResult<Schema> {
        let mut resolver = Resolver::new(self);
        let schema = resolver.named(name)?;
        Ok((*schema).clone())
    }

    /// Map every group/version/kind declared by a definition to the
    /// definition's name.
    pub fn gvk_index(&self) -> HashMap<Gvk, String> {
        let mut index = HashMap::new();
        for (name, schema) in &self.definitions {
            let Some(gvks) = schema
                .get("x-kubernetes-group-version-kind")
                .and_then(Value::as_array)
            else {
                continue;
            };
            for gvk in gvks {
                let field = |key: &str| {
                    gvk.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                index.insert((field("group"), field("version"), field("kind")), name.clone());
            }
        }
        index
    }
}

impl Schema {
    /// Convert a JSON Schema value, resolving `$ref`s against `definitions`.
    pub fn from_json(value: &Value, definitions: &OpenApiDefinitions) -> SchemaResult<Schema> {
        let mut resolver = Resolver::new(definitions);
        let schema = resolver.convert(value)?;
        Ok((*schema).clone())
    }
}

struct Resolver<'a> {
    definitions: &'a OpenApiDefinitions,
    resolved: HashMap<String, Rc<Schema>>,
    in_progress: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(definitions: &'a OpenApiDefinitions) -> Self {
        Self {
            definitions,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    fn named(&mut self, name: &str) -> SchemaResult<Rc<Schema>> {
        if let Some(schema) = self.resolved.get(name) {
            return Ok(schema.clone());
        }
        if self.in_progress.iter().any(|n| n == name) {
            return Ok(Rc::new(Schema::any().with_id(name)));
        }
        let value = self
            .definitions
            .get(name)
            .ok_or_else(|| SchemaError::UnresolvedRef(name.to_string()))?;

        self.in_progress.push(name.to_string());
        let converted = self.convert(value);
        self.in_progress.pop();

        let mut schema = (*converted?).clone();
        schema.annotations_mut().id = Some(name.to_string());
        let schema = Rc::new(schema);
        self.resolved.insert(name.to_string(), schema.clone());
        Ok(schema)
    }

    fn convert(&mut self, value: &Value) -> SchemaResult<Rc<Schema>> {
        let Some(object) = value.as_object() else {
            return match value {
                Value::Bool(true) => Ok(Rc::new(Schema::any())),
                _ => Err(SchemaError::InvalidType(value.to_string())),
            };
        };

        if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
            let name = reference
                .strip_prefix(DEFINITIONS_PREFIX)
                .or_else(|| reference.strip_prefix(COMPONENTS_PREFIX))
                .ok_or_else(|| SchemaError::UnresolvedRef(reference.to_string()))?;
            return self.named(name);
        }

        let annotations = annotations(object);

        if let Some(all_of) = object.get("allOf").and_then(Value::as_array) {
            let mut schema = self.all_of(all_of)?;
            merge_annotations(schema.annotations_mut(), annotations);
            return Ok(Rc::new(schema));
        }

        let mut schema = self.convert_typed(object)?;
        merge_annotations(schema.annotations_mut(), annotations);
        Ok(Rc::new(schema))
    }

    fn convert_typed(&mut self, object: &Map<String, Value>) -> SchemaResult<Schema> {
        if object.get("x-kubernetes-int-or-string") == Some(&Value::Bool(true)) {
            return Ok(Schema::String(StringSchema {
                format: Some(INT_OR_STRING.to_string()),
                ..Default::default()
            }));
        }

        if let Some(alternatives) = object
            .get("oneOf")
            .or_else(|| object.get("anyOf"))
            .and_then(Value::as_array)
        {
            let schemas = alternatives
                .iter()
                .map(|alt| self.convert(alt))
                .collect::<SchemaResult<Vec<_>>>()?;
            return Ok(Schema::OneOf(OneOfSchema {
                schemas,
                ..Default::default()
            }));
        }

        match object.get("type") {
            Some(Value::String(type_name)) => self.convert_type(type_name, object),
            Some(Value::Array(types)) => {
                let mut schemas = Vec::new();
                for type_name in types {
                    let type_name = type_name
                        .as_str()
                        .ok_or_else(|| SchemaError::InvalidType(type_name.to_string()))?;
                    schemas.push(Rc::new(self.convert_type(type_name, object)?));
                }
                Ok(Schema::OneOf(OneOfSchema {
                    schemas,
                    ..Default::default()
                }))
            }
            Some(other) => Err(SchemaError::InvalidType(other.to_string())),
            None if object.contains_key("properties")
                || object.contains_key("additionalProperties") =>
            {
                self.convert_type("object", object)
            }
            None if object.contains_key("items") => self.convert_type("array", object),
            None => Ok(Schema::any()),
        }
    }

    fn convert_type(
        &mut self,
        type_name: &str,
        object: &Map<String, Value>,
    ) -> SchemaResult<Schema> {
        let schema = match type_name {
            "object" => {
                let mut properties = IndexMap::new();
                if let Some(props) = object.get("properties").and_then(Value::as_object) {
                    for (name, prop) in props {
                        properties.insert(name.clone(), self.convert(prop)?);
                    }
                }
                let required = object
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                let additional_properties = match object.get("additionalProperties") {
                    None | Some(Value::Bool(true)) => AdditionalProperties::Allowed,
                    Some(Value::Bool(false)) => AdditionalProperties::Denied,
                    Some(schema) => AdditionalProperties::Schema(self.convert(schema)?),
                };
                Schema::Object(ObjectSchema {
                    properties,
                    required,
                    additional_properties,
                    ..Default::default()
                })
            }
            "array" => Schema::Array(ArraySchema {
                items: match object.get("items") {
                    Some(items) if items.is_object() => Some(self.convert(items)?),
                    _ => None,
                },
                ..Default::default()
            }),
            "integer" | "number" => number_schema(type_name == "integer", object),
            "string" => Schema::String(StringSchema {
                min_length: get_usize(object, "minLength"),
                max_length: get_usize(object, "maxLength"),
                pattern: get_str(object, "pattern"),
                format: get_str(object, "format"),
                ..Default::default()
            }),
            "boolean" => Schema::Boolean(BooleanSchema::default()),
            "null" => Schema::Null(NullSchema::default()),
            other => return Err(SchemaError::InvalidType(other.to_string())),
        };
        Ok(schema)
    }

    /// `allOf` with one member is how OpenAPI v3 attaches annotations to a
    /// reference. With several object members their properties are
    /// combined. Anything else falls back to the first member.
    fn all_of(&mut self, members: &[Value]) -> SchemaResult<Schema> {
        let converted = members
            .iter()
            .map(|m| self.convert(m))
            .collect::<SchemaResult<Vec<_>>>()?;

        let Some(first) = converted.first() else {
            return Ok(Schema::any());
        };
        if converted.len() == 1 || !converted.iter().all(|s| matches!(**s, Schema::Object(_))) {
            return Ok((**first).clone());
        }

        let mut combined = ObjectSchema::default();
        for schema in &converted {
            if let Schema::Object(object) = &**schema {
                for (name, prop) in &object.properties {
                    combined.properties.insert(name.clone(), prop.clone());
                }
                for name in &object.required {
                    if !combined.required.contains(name) {
                        combined.required.push(name.clone());
                    }
                }
            }
        }
        Ok(Schema::Object(combined))
    }
}

fn number_schema(integer: bool, object: &Map<String, Value>) -> Schema {
    let mut schema = NumberSchema {
        integer,
        minimum: get_f64(object, "minimum"),
        maximum: get_f64(object, "maximum"),
        multiple_of: get_f64(object, "multipleOf"),
        ..Default::default()
    };
    // draft 4 / OpenAPI v2 spell exclusive bounds as flags on minimum and
    // maximum; later drafts give the bound itself
    match object.get("exclusiveMinimum") {
        Some(Value::Bool(true)) => schema.exclusive_minimum = schema.minimum.take(),
        Some(bound) => schema.exclusive_minimum = bound.as_f64(),
        None => {}
    }
    match object.get("exclusiveMaximum") {
        Some(Value::Bool(true)) => schema.exclusive_maximum = schema.maximum.take(),
        Some(bound) => schema.exclusive_maximum = bound.as_f64(),
        None => {}
    }
    Schema::Number(schema)
}

fn annotations(object: &Map<String, Value>) -> SchemaAnnotations {
    SchemaAnnotations {
        id: get_str(object, "$id"),
        description: get_str(object, "description"),
        default: object.get("default").map(Node::from_json),
        patch_strategy: get_str(object, "x-kubernetes-patch-strategy")
            .as_deref()
            .map(PatchStrategy::parse)
            .unwrap_or_default(),
        patch_merge_key: get_str(object, "x-kubernetes-patch-merge-key"),
    }
}

/// Fill in annotations written beside a schema without dropping the ones
/// the schema already carries (e.g. the id of a resolved reference).
fn merge_annotations(target: &mut SchemaAnnotations, extra: SchemaAnnotations) {
    if extra.id.is_some() {
        target.id = extra.id;
    }
    if extra.description.is_some() {
        target.description = extra.description;
    }
    if extra.default.is_some() {
        target.default = extra.default;
    }
    if extra.patch_strategy != PatchStrategy::Replace {
        target.patch_strategy = extra.patch_strategy;
    }
    if extra.patch_merge_key.is_some() {
        target.patch_merge_key = extra.patch_merge_key;
    }
}

fn get_str(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn get_f64(object: &Map<String, Value>, key: &str) -> Option<f64> {
    object.get(key).and_then(Value::as_f64)
}

fn get_usize(object: &Map<String, Value>, key: &str) -> Option<usize> {
    object
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn k8s_document() -> Value {
        json!({
            "swagger": "2.0",
            "definitions": {
                "io.k8s.api.core.v1.Pod": {
                    "type": "object",
                    "properties": {
                        "apiVersion": {"type": "string"},
                        "kind": {"type": "string"},
                        "metadata": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta"},
                        "spec": {"$ref": "#/definitions/io.k8s.api.core.v1.PodSpec"}
                    },
                    "x-kubernetes-group-version-kind": [
                        {"group": "", "version": "v1", "kind": "Pod"}
                    ]
                },
                "io.k8s.api.core.v1.PodSpec": {
                    "type": "object",
                    "required": ["containers"],
                    "properties": {
                        "containers": {
                            "type": "array",
                            "items": {"$ref": "#/definitions/io.k8s.api.core.v1.Container"},
                            "x-kubernetes-patch-merge-key": "name",
                            "x-kubernetes-patch-strategy": "merge"
                        }
                    }
                },
                "io.k8s.api.core.v1.Container": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {"type": "string"},
                        "ports": {
                            "type": "array",
                            "items": {"$ref": "#/definitions/io.k8s.api.core.v1.ContainerPort"}
                        }
                    }
                },
                "io.k8s.api.core.v1.ContainerPort": {
                    "type": "object",
                    "properties": {
                        "containerPort": {"type": "integer", "format": "int32"},
                        "name": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.util.intstr.IntOrString"}
                    }
                },
                "io.k8s.apimachinery.pkg.util.intstr.IntOrString": {
                    "type": "string",
                    "format": "int-or-string"
                },
                "io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "labels": {"type": "object", "additionalProperties": {"type": "string"}},
                        "ownerReferences": {
                            "type": "array",
                            "items": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta"}
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_resolve_definition_with_refs() {
        let definitions = OpenApiDefinitions::from_document(&k8s_document());
        let pod = definitions.resolve("io.k8s.api.core.v1.Pod").unwrap();

        assert_eq!(pod.name(), "io.k8s.api.core.v1.Pod");
        let spec = pod.property("spec").unwrap();
        assert_eq!(spec.name(), "io.k8s.api.core.v1.PodSpec");

        let containers = spec.property("containers").unwrap();
        assert_eq!(containers.annotations().patch_strategy, PatchStrategy::Merge);
        assert_eq!(
            containers.annotations().patch_merge_key.as_deref(),
            Some("name")
        );
        assert_eq!(containers.items().unwrap().name(), "io.k8s.api.core.v1.Container");
    }

    #[test]
    fn test_cycle_resolves_to_any() {
        let definitions = OpenApiDefinitions::from_document(&k8s_document());
        let meta = definitions
            .resolve("io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta")
            .unwrap();
        let owners = meta.property("ownerReferences").unwrap();
        assert_eq!(owners.items().unwrap().type_name(), "any");
    }

    #[test]
    fn test_gvk_index() {
        let definitions = OpenApiDefinitions::from_document(&k8s_document());
        let index = definitions.gvk_index();
        assert_eq!(
            index.get(&("".to_string(), "v1".to_string(), "Pod".to_string())),
            Some(&"io.k8s.api.core.v1.Pod".to_string())
        );
    }

    #[test]
    fn test_int_or_string_extension() {
        let schema = Schema::from_json(
            &json!({"x-kubernetes-int-or-string": true}),
            &OpenApiDefinitions::new(),
        )
        .unwrap();
        assert!(matches!(&schema, Schema::String(s) if s.is_int_or_string()));
    }

    #[test]
    fn test_type_inference_and_unions() {
        let defs = OpenApiDefinitions::new();
        let schema = Schema::from_json(&json!({"properties": {"a": {}}}), &defs).unwrap();
        assert_eq!(schema.type_name(), "object");
        assert_eq!(schema.property("a").unwrap().type_name(), "any");

        let schema = Schema::from_json(&json!({"type": ["string", "null"]}), &defs).unwrap();
        assert_eq!(schema.type_name(), "oneOf");
    }

    #[test]
    fn test_exclusive_bounds_both_drafts() {
        let defs = OpenApiDefinitions::new();
        let draft4 = Schema::from_json(
            &json!({"type": "integer", "minimum": 0, "exclusiveMinimum": true}),
            &defs,
        )
        .unwrap();
        let Schema::Number(n) = draft4 else {
            panic!("expected number schema");
        };
        assert_eq!(n.minimum, None);
        assert_eq!(n.exclusive_minimum, Some(0.0));

        let later = Schema::from_json(&json!({"type": "number", "exclusiveMaximum": 5}), &defs)
            .unwrap();
        let Schema::Number(n) = later else {
            panic!("expected number schema");
        };
        assert_eq!(n.exclusive_maximum, Some(5.0));
    }

    #[test]
    fn test_unresolved_ref() {
        let err = Schema::from_json(
            &json!({"$ref": "#/definitions/Missing"}),
            &OpenApiDefinitions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedRef(name) if name == "Missing"));
    }

    #[test]
    fn test_default_becomes_node() {
        let schema = Schema::from_json(
            &json!({"type": "string", "default": "TCP"}),
            &OpenApiDefinitions::new(),
        )
        .unwrap();
        let default = schema.annotations().default.as_ref().unwrap();
        assert_eq!(default.as_str(), Some("TCP"));
    }
}
