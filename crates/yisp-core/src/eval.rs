//! The evaluator.
//!
//! Evaluation walks a node tree in one of two modes. In quote mode the tree
//! is rebuilt as data. In eval mode an array is a call: its head is either a
//! special form (`if`, `lambda`, `import`) or something to apply to the
//! evaluated rest. The `!yisp` and `!quote` tags switch mode for the node
//! they are written on. Any other tag that names a type casts the node's
//! result to that type.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};
use yisp_source_map::SourceInfo;
use yisp_yaml::{Scalar, resolve_plain};

use crate::engine::{Engine, resolve_path};
use crate::env::Env;
use crate::error::{EvaluationError, Result};
use crate::node::{Lambda, Node, Param, Value};
use crate::parse::is_merge_key;
use crate::provider::split_api_version;
use crate::schema::{Schema, cast};

pub const YISP_TAG: &str = "!yisp";
pub const QUOTE_TAG: &str = "!quote";

const SCHEMA_KEY: &str = "$schema";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Build structure; arrays are data
    Quote,
    /// Arrays are calls
    Eval,
}

impl Engine {
    /// Evaluate `node` in `env`.
    ///
    /// After the value is computed, an anchor on the node binds the result
    /// in the root environment, and a tag naming a type casts the result.
    pub fn eval(&mut self, node: Node, env: &Env, mode: Mode) -> Result<Node> {
        let mode = match node.tag.as_deref() {
            Some(YISP_TAG) => Mode::Eval,
            Some(QUOTE_TAG) => Mode::Quote,
            _ => mode,
        };
        let anchor = node.anchor.clone();
        let tag = node.tag.clone();
        let location = node.location().cloned();
        let key_comments = node.attr.key_comments.clone();
        let key_style = node.attr.key_style;

        let mut result = self.eval_value(node, env, mode)?;
        result.anchor = None;
        result.attr.key_comments = key_comments;
        result.attr.key_style = key_style;
        if result.attr.sources.is_empty()
            && let Some(location) = &location
        {
            result.attr.sources.push(location.clone());
        }

        if let Some(anchor) = anchor {
            trace!(anchor = %anchor, "binding anchor");
            env.root().set(anchor.clone(), result.clone());
            if let Value::Lambda(lambda) = &result.value {
                lambda.closure.set(anchor, result.clone());
            }
        }

        if let Some(schema) = tag.as_deref().and_then(|tag| self.tag_type(tag, env)) {
            result = cast(result, &schema).map_err(|err| {
                EvaluationError::validation(
                    format!("cast to {} failed", schema.name()),
                    err,
                    location.as_ref(),
                )
            })?;
        }
        Ok(result)
    }

    fn eval_value(&mut self, node: Node, env: &Env, mode: Mode) -> Result<Node> {
        let location = node.location().cloned();
        match node.value {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
                let value = match node.tag.as_deref() {
                    Some(tag) if tag.starts_with("!!") => {
                        coerce_scalar(node.value, tag, location.as_ref())?
                    }
                    _ => node.value,
                };
                Ok(Node { value, ..node })
            }
            Value::Symbol(name) => self.lookup_symbol(&name, env, location.as_ref()),
            Value::Parameter(_) | Value::Lambda(_) | Value::Type(_) => Ok(node),
            Value::Array(items) => {
                let shell = Node {
                    value: Value::Null,
                    ..node
                };
                match mode {
                    Mode::Quote => {
                        let items = items
                            .into_iter()
                            .map(|item| self.eval(item, env, mode))
                            .collect::<Result<Vec<_>>>()?;
                        Ok(Node {
                            value: Value::Array(items),
                            ..shell
                        })
                    }
                    Mode::Eval if items.is_empty() => Ok(Node {
                        value: Value::Array(items),
                        ..shell
                    }),
                    Mode::Eval => self.eval_call(items, env, mode, location.as_ref()),
                }
            }
            Value::Map(entries) => {
                let shell = Node {
                    value: Value::Null,
                    ..node
                };
                self.eval_map(entries, shell, env, mode)
            }
        }
    }

    fn lookup_symbol(&self, name: &str, env: &Env, location: Option<&SourceInfo>) -> Result<Node> {
        match env.get(name) {
            Ok(node) => Ok(node),
            Err(err) => match self.primitive_type(name) {
                Some(schema) => Ok(Node::type_node(schema)),
                None => Err(EvaluationError::new(err.to_string(), location)),
            },
        }
    }

    /// The type a tag names, if any. Mode tags and standard `!!` tags never
    /// name a type.
    fn tag_type(&self, tag: &str, env: &Env) -> Option<Rc<Schema>> {
        if tag.starts_with("!!") || tag == YISP_TAG || tag == QUOTE_TAG {
            return None;
        }
        self.lookup_type(tag.strip_prefix('!')?, env)
    }

    pub(crate) fn lookup_type(&self, name: &str, env: &Env) -> Option<Rc<Schema>> {
        match env.get(name) {
            Ok(Node {
                value: Value::Type(schema),
                ..
            }) => Some(schema),
            Ok(_) => None,
            Err(_) => self.primitive_type(name),
        }
    }

    fn eval_call(
        &mut self,
        items: Vec<Node>,
        env: &Env,
        mode: Mode,
        location: Option<&SourceInfo>,
    ) -> Result<Node> {
        let mut items = items.into_iter();
        let Some(head) = items.next() else {
            return Ok(Node::array(Vec::new()));
        };
        let callee_name = match &head.value {
            Value::Symbol(name) | Value::String(name) => name.clone(),
            _ => head.type_name().to_string(),
        };
        let head = self.eval(head, env, mode)?;
        let operands: Vec<Node> = items.collect();

        match head.as_str() {
            Some("if") => return self.eval_if(operands, env, mode, location),
            Some("lambda") => return self.eval_lambda(operands, env, location),
            Some("import") => return self.eval_import(operands, env),
            _ => {}
        }

        let args = operands
            .into_iter()
            .map(|arg| self.eval(arg, env, mode))
            .collect::<Result<Vec<_>>>()?;
        trace!(callee = %callee_name, args = args.len(), "apply");
        self.apply(&head, args, env, mode)
            .map_err(|err| err.wrap(format!("in call to {}", callee_name), location))
    }

    fn eval_if(
        &mut self,
        operands: Vec<Node>,
        env: &Env,
        mode: Mode,
        location: Option<&SourceInfo>,
    ) -> Result<Node> {
        let Ok([condition, then, otherwise]) = <[Node; 3]>::try_from(operands) else {
            return Err(EvaluationError::new(
                "if requires exactly 3 arguments: condition, then and else",
                location,
            ));
        };
        let condition = self.eval(condition, env, mode)?;
        trace!(taken = condition.truthiness(), "if");
        if condition.truthiness() {
            self.eval(then, env, mode)
        } else {
            self.eval(otherwise, env, mode)
        }
    }

    fn eval_lambda(
        &mut self,
        operands: Vec<Node>,
        env: &Env,
        location: Option<&SourceInfo>,
    ) -> Result<Node> {
        if operands.len() < 2 {
            return Err(EvaluationError::new(
                "lambda requires a parameter list and a body",
                location,
            ));
        }
        let mut operands = operands.into_iter();
        let Some(params_node) = operands.next() else {
            return Err(EvaluationError::new("lambda requires a parameter list", location));
        };

        let returns = params_node
            .tag
            .as_deref()
            .and_then(|tag| self.tag_type(tag, env));
        let Value::Array(param_nodes) = &params_node.value else {
            return Err(EvaluationError::at(
                &params_node,
                format!(
                    "lambda parameters must be a list, got {}",
                    params_node.type_name()
                ),
            ));
        };
        let mut params = Vec::with_capacity(param_nodes.len());
        for param in param_nodes {
            let name = match &param.value {
                Value::Symbol(name) | Value::Parameter(name) | Value::String(name) => name.clone(),
                _ => {
                    return Err(EvaluationError::at(
                        param,
                        format!("invalid lambda parameter of type {}", param.type_name()),
                    ));
                }
            };
            let schema = match param.tag.as_deref() {
                Some(tag) => Some(self.declared_type(tag, env, param)?),
                None => None,
            };
            params.push(Param { name, schema });
        }

        let mut bodies: Vec<Node> = operands.collect();
        let body = if bodies.len() == 1 {
            bodies.remove(0)
        } else {
            let mut forms = vec![Node::string("progn")];
            forms.extend(bodies);
            Node::array(forms).with_tag(YISP_TAG)
        };

        trace!(params = params.len(), "lambda");
        let mut node = Node::lambda(Lambda {
            params,
            returns,
            body,
            closure: env.snapshot(),
        });
        if let Some(location) = location {
            node.attr.sources.push(location.clone());
        }
        Ok(node)
    }

    /// Resolve the type named by a tag written in a lambda signature.
    fn declared_type(&self, tag: &str, env: &Env, node: &Node) -> Result<Rc<Schema>> {
        let name = tag.strip_prefix('!').unwrap_or(tag);
        self.lookup_type(name, env)
            .ok_or_else(|| EvaluationError::at(node, format!("unknown type: {}", name)))
    }

    /// Bind each `{name: path}` (or `[name, path]`) operand to the bindings
    /// of the file at `path`, evaluated in a fresh environment.
    fn eval_import(&mut self, operands: Vec<Node>, env: &Env) -> Result<Node> {
        for operand in operands {
            let spec = self.eval(operand, env, Mode::Quote)?;
            let pairs: Vec<(String, Node)> = match spec.value {
                Value::Map(entries) => entries.into_iter().collect(),
                Value::Array(items) if items.len() == 2 && items[0].as_str().is_some() => {
                    let mut items = items.into_iter();
                    match (items.next(), items.next()) {
                        (Some(name), Some(path)) => {
                            vec![(name.as_str().unwrap_or_default().to_string(), path)]
                        }
                        _ => Vec::new(),
                    }
                }
                _ => {
                    return Err(EvaluationError::new(
                        "import expects {name: path} maps or [name, path] pairs",
                        spec.location(),
                    ));
                }
            };
            for (name, path) in pairs {
                self.import_one(name, &path, env)?;
            }
        }
        Ok(Node::null())
    }

    fn import_one(&mut self, name: String, path: &Node, env: &Env) -> Result<()> {
        let Some(relative) = path.as_str() else {
            return Err(EvaluationError::at(
                path,
                format!("import path must be a string, got {}", path.type_name()),
            ));
        };
        let resolved = resolve_path(relative, path.location());
        let module = Env::new();
        self.load_file(&resolved, &module, path.location())
            .map_err(|err| err.wrap(format!("in import of {}", relative), path.location()))?;
        debug!(name = %name, path = %resolved.display(), "imported module");
        env.root().set(name, Node::map(module.bindings()));
        Ok(())
    }

    fn eval_map(
        &mut self,
        entries: IndexMap<String, Node>,
        shell: Node,
        env: &Env,
        mode: Mode,
    ) -> Result<Node> {
        let mut out: IndexMap<String, Node> = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let value = self.eval(value, env, mode)?;
            if is_merge_key(&key) {
                splat(&mut out, value)?;
            } else {
                out.insert(key, value);
            }
        }

        let declared = out.get(SCHEMA_KEY).cloned();
        let api_version = out.get("apiVersion").and_then(Node::as_str).map(str::to_string);
        let kind = out.get("kind").and_then(Node::as_str).map(str::to_string);
        let node = Node {
            value: Value::Map(out),
            ..shell
        };

        if let Some(declared) = declared {
            return self.type_manifest(node, &declared);
        }
        if let (Some(api_version), Some(kind)) = (api_version, kind) {
            return self.type_by_gvk(node, &api_version, &kind);
        }
        Ok(node)
    }

    /// Resolve the schema named by `$schema` and cast the map to it.
    fn type_manifest(&mut self, node: Node, declared: &Node) -> Result<Node> {
        let loaded = match &declared.value {
            Value::Type(schema) => Ok(schema.clone()),
            Value::String(reference) if is_schema_url(reference) => {
                self.provider.load_by_url(reference)
            }
            Value::String(reference) => self.provider.load_by_id(reference),
            _ => {
                return Err(EvaluationError::at(
                    declared,
                    format!(
                        "$schema must be a type or a string, got {}",
                        declared.type_name()
                    ),
                ));
            }
        };
        let schema = match loaded {
            Ok(schema) => schema,
            Err(err) if self.options.allow_untyped_manifest => {
                warn!(error = %err, "leaving manifest untyped");
                return Ok(node);
            }
            Err(err) => return Err(EvaluationError::schema(err, declared.location())),
        };

        let location = node.location().cloned();
        let fallback = self.options.allow_untyped_manifest.then(|| node.clone());
        match cast(node, &schema) {
            Ok(node) => Ok(node),
            Err(err) => match fallback {
                Some(node) => {
                    warn!(schema = schema.name(), error = %err, "leaving manifest untyped");
                    Ok(node)
                }
                None => Err(EvaluationError::validation(
                    format!("manifest does not satisfy {}", schema.name()),
                    err,
                    location.as_ref(),
                )),
            },
        }
    }

    /// Attach the Kubernetes schema for `apiVersion`/`kind`. The manifest is
    /// checked against it when rendered.
    fn type_by_gvk(&mut self, mut node: Node, api_version: &str, kind: &str) -> Result<Node> {
        let (group, version) = split_api_version(api_version);
        match self.provider.load_by_gvk(group, version, kind) {
            Ok(schema) => {
                debug!(api_version, kind, schema = schema.name(), "typed manifest");
                node.schema = Some(schema);
                Ok(node)
            }
            Err(err) if self.options.allow_untyped_manifest => {
                warn!(api_version, kind, error = %err, "leaving manifest untyped");
                Ok(node)
            }
            Err(err) => Err(EvaluationError::schema(err, node.location())
                .wrap(format!("no schema for {} {}", api_version, kind), node.location())),
        }
    }
}

/// Splat the value of a merge key into `out`. Keys already present win.
fn splat(out: &mut IndexMap<String, Node>, value: Node) -> Result<()> {
    let location = value.location().cloned();
    let sources = match value.value {
        Value::Map(map) => vec![map],
        Value::Array(items) => {
            let mut maps = Vec::with_capacity(items.len());
            for item in items {
                match item.value {
                    Value::Map(map) => maps.push(map),
                    Value::Null => {}
                    _ => {
                        return Err(EvaluationError::at(
                            &item,
                            format!("cannot merge {} into a map", item.type_name()),
                        ));
                    }
                }
            }
            maps
        }
        Value::Null => Vec::new(),
        _ => {
            return Err(EvaluationError::new(
                format!("cannot merge {} into a map", value.type_name()),
                location.as_ref(),
            ));
        }
    };
    for map in sources {
        for (key, value) in map {
            out.entry(key).or_insert(value);
        }
    }
    Ok(())
}

fn is_schema_url(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("file://")
        || reference.ends_with(".json")
}

/// Apply a standard scalar tag (`!!int`, `!!float`, `!!bool`, `!!str`,
/// `!!null`) to a scalar's text.
fn coerce_scalar(value: Value, tag: &str, location: Option<&SourceInfo>) -> Result<Value> {
    let text = match &value {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => return Ok(value),
    };
    let coerced = match tag {
        "!!str" => Some(Value::String(text.clone())),
        "!!int" => match resolve_plain(text.trim()) {
            Scalar::Int(i) => Some(Value::Int(i)),
            _ => None,
        },
        "!!float" => match resolve_plain(text.trim()) {
            Scalar::Float(f) => Some(Value::Float(f)),
            Scalar::Int(i) => Some(Value::Float(i as f64)),
            _ => None,
        },
        "!!bool" => match resolve_plain(text.trim()) {
            Scalar::Bool(b) => Some(Value::Bool(b)),
            _ => None,
        },
        "!!null" => match resolve_plain(text.trim()) {
            Scalar::Null => Some(Value::Null),
            _ => None,
        },
        _ => return Ok(value),
    };
    coerced.ok_or_else(|| {
        EvaluationError::new(
            format!("cannot parse {:?} as {}", text, &tag[2..]),
            location,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::node::Kind;

    fn eval_str(source: &str) -> Result<Node> {
        let mut engine = Engine::new(EngineOptions::default());
        let result = engine.run(source, &Env::new(), Some("test.yaml"))?;
        Ok(result.as_array().unwrap()[0].clone())
    }

    #[test]
    fn test_quote_mode_is_data() {
        let node = eval_str("[+, 1, 2]").unwrap();
        assert_eq!(node.to_json(), serde_json::json!(["+", 1, 2]));
    }

    #[test]
    fn test_yisp_tag_evaluates() {
        let node = eval_str("!yisp [+, 1, 2]").unwrap();
        assert!(matches!(node.value, Value::Int(3)));
    }

    #[test]
    fn test_quote_tag_inside_eval() {
        let node = eval_str("!yisp [progn, !quote [+, 1, 2]]").unwrap();
        assert_eq!(node.to_json(), serde_json::json!(["+", 1, 2]));
    }

    #[test]
    fn test_scalar_coercion_tags() {
        let node = eval_str("a: !!int '3'\nb: !!float 2\nc: !!str 10\nd: !!bool 'true'\n").unwrap();
        assert_eq!(
            node.to_json(),
            serde_json::json!({"a": 3, "b": 2.0, "c": "10", "d": true})
        );
    }

    #[test]
    fn test_scalar_coercion_failure() {
        let err = eval_str("a: !!int abc\n").unwrap_err();
        assert_eq!(err.message, "cannot parse \"abc\" as int");
    }

    #[test]
    fn test_undefined_symbol() {
        let err = eval_str("a: *missing\n").unwrap_err();
        assert_eq!(err.message, "undefined symbol: missing");
        assert_eq!(err.location.unwrap().line, 1);
    }

    #[test]
    fn test_primitive_type_symbol() {
        let node = eval_str("t: *integer\n").unwrap();
        assert_eq!(node.get("t").unwrap().kind(), Kind::Type);
    }

    #[test]
    fn test_merge_keys_do_not_override() {
        let node = eval_str(
            "base: &base {a: 1, b: 2}\nout:\n  b: 3\n  <<: *base\n  <<: [{c: 4}, null]\n",
        )
        .unwrap();
        assert_eq!(
            node.get("out").unwrap().to_json(),
            serde_json::json!({"b": 3, "a": 1, "c": 4})
        );
    }

    #[test]
    fn test_merge_key_rejects_scalars() {
        let err = eval_str("out:\n  <<: 5\n").unwrap_err();
        assert_eq!(err.message, "cannot merge int into a map");
    }

    #[test]
    fn test_if_arity() {
        let err = eval_str("!yisp [if, true, 1]").unwrap_err();
        assert_eq!(
            err.message,
            "if requires exactly 3 arguments: condition, then and else"
        );
    }

    #[test]
    fn test_lambda_needs_list_params() {
        let err = eval_str("!yisp [lambda, x, 1]").unwrap_err();
        assert_eq!(err.message, "lambda parameters must be a list, got string");
    }

    #[test]
    fn test_lambda_return_type_from_param_list_tag() {
        let node = eval_str("!yisp [[lambda, !integer [x], *x], 2]").unwrap();
        assert!(matches!(node.value, Value::Int(2)));

        let err = eval_str("!yisp [[lambda, !string [x], *x], 2]").unwrap_err();
        assert_eq!(err.message, "in call to array");
        assert_eq!(
            err.chain()[1].message,
            "result does not satisfy return type string"
        );

        // tags that name no type leave the result unchecked
        let node = eval_str("!yisp [[lambda, !quote [x], 1], 2]").unwrap();
        assert!(matches!(node.value, Value::Int(1)));
        let node = eval_str("!yisp [[lambda, !Nothing [x], *x], 3]").unwrap();
        assert!(matches!(node.value, Value::Int(3)));
    }

    #[test]
    fn test_typed_tag_casts() {
        let node = eval_str("port: !integer 8080\n").unwrap();
        let port = node.get("port").unwrap();
        assert_eq!(port.schema.as_ref().unwrap().name(), "integer");

        let err = eval_str("port: !integer eighty\n").unwrap_err();
        assert_eq!(err.message, "cast to integer failed");
    }

    #[test]
    fn test_parameter_nodes_name_params() {
        let mut engine = Engine::default();
        let form = Node::array(vec![
            Node::array(vec![
                Node::string("lambda"),
                Node::array(vec![Node::parameter("x")]),
                Node::symbol("x"),
            ]),
            Node::int(7),
        ]);
        let result = engine.eval(form, &Env::new(), Mode::Eval).unwrap();
        assert!(matches!(result.value, Value::Int(7)));
    }

    #[test]
    fn test_unknown_tags_pass_through() {
        let node = eval_str("a: !Ref thing\n").unwrap();
        assert_eq!(node.get("a").unwrap().as_str(), Some("thing"));
    }
}
