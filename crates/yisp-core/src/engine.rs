//! The evaluation engine and its entry points.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;
use yisp_source_map::{SourceContext, SourceInfo};
use yisp_yaml::YamlNode;

use crate::env::Env;
use crate::error::{EvaluationError, Result};
use crate::eval::Mode;
use crate::node::{Node, Value};
use crate::parse::from_yaml;
use crate::provider::{SchemaProvider, StaticSchemaProvider};
use crate::registry::{Operator, OperatorRegistry};
use crate::render;
use crate::schema::Schema;

pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Leave manifests untyped, with a warning, when their schema cannot be
    /// resolved or they do not satisfy it.
    pub allow_untyped_manifest: bool,
    /// How deeply `include` and `import` may nest.
    pub max_include_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            allow_untyped_manifest: false,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

pub struct Engine {
    pub(crate) options: EngineOptions,
    settings: HashMap<String, String>,
    pub(crate) registry: OperatorRegistry,
    pub(crate) provider: Box<dyn SchemaProvider>,
    sources: SourceContext,
    prelude: HashMap<String, Rc<Schema>>,
    include_depth: usize,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let prelude = Schema::primitives()
            .into_iter()
            .map(|(name, schema)| (name.to_string(), Rc::new(schema.with_id(name))))
            .collect();
        Self {
            options,
            settings: HashMap::new(),
            registry: OperatorRegistry::new(),
            provider: Box::new(StaticSchemaProvider::new()),
            sources: SourceContext::new(),
            prelude,
            include_depth: 0,
        }
    }

    pub fn with_provider(mut self, provider: impl SchemaProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn provider(&self) -> &dyn SchemaProvider {
        self.provider.as_ref()
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.registry
    }

    pub fn register_operator(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        operator: impl Operator + 'static,
    ) {
        self.registry.register(module, name, operator);
    }

    /// Every source evaluated so far, for rendering error excerpts.
    pub fn sources(&self) -> &SourceContext {
        &self.sources
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.settings.insert(key.into(), value.into());
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// One of the primitive types available in every program.
    pub fn primitive_type(&self, name: &str) -> Option<Rc<Schema>> {
        self.prelude.get(name).cloned()
    }

    /// Evaluate every document of `source` in `env`.
    ///
    /// Documents start in quote mode. The result is a document root holding
    /// one node per document; documents that evaluate to null are dropped
    /// and document roots returned by a document are spliced in.
    pub fn run(&mut self, source: &str, env: &Env, location: Option<&str>) -> Result<Node> {
        self.sources
            .add_file(location.unwrap_or("<input>"), source);
        let documents = yisp_yaml::parse_documents(source, location)?;

        let mut results = Vec::new();
        for document in documents {
            let node = from_yaml(document)?;
            let result = self.eval(node, env, Mode::Quote)?;
            if result.is_null() {
                continue;
            }
            if result.is_document_root {
                if let Value::Array(items) = result.value {
                    results.extend(items);
                }
            } else {
                results.push(result);
            }
        }
        Ok(Node::document_root(results))
    }

    /// Evaluate a file in a fresh environment.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<Node> {
        self.load_file(path.as_ref(), &Env::new(), None)
    }

    /// Read and run a file on behalf of `run_file`, `include` or `import`.
    pub(crate) fn load_file(
        &mut self,
        path: &Path,
        env: &Env,
        site: Option<&SourceInfo>,
    ) -> Result<Node> {
        if self.include_depth >= self.options.max_include_depth {
            return Err(EvaluationError::new(
                format!(
                    "include depth limit of {} exceeded",
                    self.options.max_include_depth
                ),
                site,
            ));
        }
        let content = std::fs::read_to_string(path).map_err(|err| {
            EvaluationError::foreign(format!("failed to read {}", path.display()), err, site)
        })?;
        debug!(path = %path.display(), depth = self.include_depth, "loading file");

        self.include_depth += 1;
        let result = self.run(&content, env, Some(&path.display().to_string()));
        self.include_depth -= 1;
        result
    }

    /// Verify attached schemas and convert to output documents.
    pub fn render(&self, node: Node) -> Result<Vec<YamlNode>> {
        let mut node = node;
        render::verify(&mut node)?;
        Ok(render::documents(&node))
    }

    /// Evaluate a file and render it as a YAML stream.
    pub fn build_yaml(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let node = self.run_file(path)?;
        let documents = self.render(node)?;
        Ok(yisp_yaml::emit_documents(&documents))
    }

    /// Evaluate a file and render it as JSON: the document itself if there
    /// is exactly one, otherwise an array of documents.
    pub fn build_json(&mut self, path: impl AsRef<Path>) -> Result<serde_json::Value> {
        let node = self.run_file(path)?;
        let documents = self.render(node)?;
        let mut values: Vec<serde_json::Value> =
            documents.iter().map(yisp_yaml::to_json).collect();
        if values.len() == 1 {
            return Ok(values.remove(0));
        }
        Ok(serde_json::Value::Array(values))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineOptions::default())
    }
}

/// Resolve `path` against the directory of the file `site` points into.
pub(crate) fn resolve_path(path: &str, site: Option<&SourceInfo>) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    site.and_then(|info| info.file.as_deref())
        .and_then(|file| Path::new(file).parent())
        .map(|dir| dir.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}
