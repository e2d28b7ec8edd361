//! Schema providers.
//!
//! The evaluator asks a [`SchemaProvider`] for the schema a manifest
//! declares, either through `$schema` (an id or a URL) or through its
//! Kubernetes `apiVersion` and `kind`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::schema::{Gvk, OpenApiDefinitions, Schema, SchemaError, SchemaResult};

pub trait SchemaProvider {
    fn load_by_id(&self, id: &str) -> SchemaResult<Rc<Schema>>;

    fn load_by_gvk(&self, group: &str, version: &str, kind: &str) -> SchemaResult<Rc<Schema>>;

    fn load_by_url(&self, url: &str) -> SchemaResult<Rc<Schema>>;
}

/// Split an `apiVersion` into group and version. `v1` is the core group.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.rsplit_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

fn gvk_key(group: &str, version: &str, kind: &str) -> Gvk {
    (group.to_string(), version.to_string(), kind.to_string())
}

fn gvk_name(group: &str, version: &str, kind: &str) -> String {
    if group.is_empty() {
        format!("{}/{}", version, kind)
    } else {
        format!("{}/{}/{}", group, version, kind)
    }
}

/// A provider holding schemas registered up front.
#[derive(Debug, Default)]
pub struct StaticSchemaProvider {
    by_id: HashMap<String, Rc<Schema>>,
    by_gvk: HashMap<Gvk, Rc<Schema>>,
}

impl StaticSchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, schema: Schema) {
        let id = id.into();
        let schema = Rc::new(schema.with_id(id.clone()));
        self.by_id.insert(id, schema);
    }

    pub fn register_gvk(&mut self, group: &str, version: &str, kind: &str, schema: Schema) {
        self.by_gvk
            .insert(gvk_key(group, version, kind), Rc::new(schema));
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn load_by_id(&self, id: &str) -> SchemaResult<Rc<Schema>> {
        self.by_id
            .get(id)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(id.to_string()))
    }

    fn load_by_gvk(&self, group: &str, version: &str, kind: &str) -> SchemaResult<Rc<Schema>> {
        self.by_gvk
            .get(&gvk_key(group, version, kind))
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(gvk_name(group, version, kind)))
    }

    fn load_by_url(&self, url: &str) -> SchemaResult<Rc<Schema>> {
        self.load_by_id(url)
    }
}

/// A provider backed by OpenAPI documents, such as a cluster's
/// `/openapi/v2` swagger saved to disk.
///
/// Resolved schemas are memoized by definition name, and documents loaded
/// by URL are memoized by URL.
#[derive(Debug, Default)]
pub struct OpenApiSchemaProvider {
    definitions: OpenApiDefinitions,
    gvk_index: HashMap<Gvk, String>,
    resolved: RefCell<HashMap<String, Rc<Schema>>>,
    by_url: RefCell<HashMap<String, Rc<Schema>>>,
}

impl OpenApiSchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> SchemaResult<Self> {
        let mut provider = Self::new();
        provider.add_document(&serde_json::from_str(content)?);
        Ok(provider)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let mut provider = Self::new();
        provider.add_file(path)?;
        Ok(provider)
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) -> SchemaResult<()> {
        let document = read_json(path.as_ref())?;
        self.add_document(&document);
        Ok(())
    }

    pub fn add_document(&mut self, document: &Value) {
        self.definitions.extend(document);
        self.gvk_index = self.definitions.gvk_index();
        self.resolved.borrow_mut().clear();
        debug!(
            definitions = self.definitions.len(),
            kinds = self.gvk_index.len(),
            "loaded OpenAPI definitions"
        );
    }

    pub fn definitions(&self) -> &OpenApiDefinitions {
        &self.definitions
    }
}

impl SchemaProvider for OpenApiSchemaProvider {
    fn load_by_id(&self, id: &str) -> SchemaResult<Rc<Schema>> {
        if let Some(schema) = self.resolved.borrow().get(id) {
            return Ok(schema.clone());
        }
        debug!(id, "resolving schema");
        let schema = Rc::new(self.definitions.resolve(id)?);
        self.resolved
            .borrow_mut()
            .insert(id.to_string(), schema.clone());
        Ok(schema)
    }

    fn load_by_gvk(&self, group: &str, version: &str, kind: &str) -> SchemaResult<Rc<Schema>> {
        let name = self
            .gvk_index
            .get(&gvk_key(group, version, kind))
            .ok_or_else(|| SchemaError::NotFound(gvk_name(group, version, kind)))?;
        self.load_by_id(name)
    }

    /// Load a standalone JSON Schema from a local path or `file://` URL.
    /// Its own `definitions` resolve its `$ref`s.
    fn load_by_url(&self, url: &str) -> SchemaResult<Rc<Schema>> {
        if let Some(schema) = self.by_url.borrow().get(url) {
            return Ok(schema.clone());
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(SchemaError::NotFound(url.to_string()));
        }
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        debug!(path = %path.display(), "loading schema document");

        let document = read_json(&path)?;
        let definitions = OpenApiDefinitions::from_document(&document);
        let mut schema = Schema::from_json(&document, &definitions)?;
        if schema.annotations().id.is_none() {
            schema.annotations_mut().id = Some(url.to_string());
        }
        let schema = Rc::new(schema);
        self.by_url
            .borrow_mut()
            .insert(url.to_string(), schema.clone());
        Ok(schema)
    }
}

fn read_json(path: &Path) -> SchemaResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
