//! Builtin operators.
//!
//! Builtins receive their arguments already evaluated. Arithmetic works on
//! integers or on floats, never a mix of the two; comparisons promote mixed
//! operands to float.

use std::rc::Rc;

use tracing::debug;
use yisp_source_map::SourceInfo;

use crate::engine::{Engine, resolve_path};
use crate::env::Env;
use crate::error::{EvaluationError, Result};
use crate::eval::Mode;
use crate::merge::deep_merge;
use crate::node::{Node, Value};
use crate::schema::{Schema, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Default,
    Include,
    Progn,
    Pipeline,
    Schema,
    Merge,
    Patch,
}

impl Builtin {
    pub const ALL: [Builtin; 20] = [
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::Eq,
        Builtin::Ne,
        Builtin::Lt,
        Builtin::Le,
        Builtin::Gt,
        Builtin::Ge,
        Builtin::And,
        Builtin::Or,
        Builtin::Not,
        Builtin::Default,
        Builtin::Include,
        Builtin::Progn,
        Builtin::Pipeline,
        Builtin::Schema,
        Builtin::Merge,
        Builtin::Patch,
    ];

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Eq => "==",
            Builtin::Ne => "!=",
            Builtin::Lt => "<",
            Builtin::Le => "<=",
            Builtin::Gt => ">",
            Builtin::Ge => ">=",
            Builtin::And => "and",
            Builtin::Or => "or",
            Builtin::Not => "not",
            Builtin::Default => "default",
            Builtin::Include => "include",
            Builtin::Progn => "progn",
            Builtin::Pipeline => "pipeline",
            Builtin::Schema => "schema",
            Builtin::Merge => "merge",
            Builtin::Patch => "patch",
        }
    }

    pub fn call(
        self,
        engine: &mut Engine,
        env: &Env,
        mode: Mode,
        args: Vec<Node>,
        site: Option<&SourceInfo>,
    ) -> Result<Node> {
        match self {
            Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div => {
                self.arithmetic(args, site)
            }
            Builtin::Lt | Builtin::Le | Builtin::Gt | Builtin::Ge => self.compare(args, site),
            Builtin::Eq | Builtin::Ne => {
                let [a, b] = self.exactly::<2>(args, site)?;
                let equal = values_equal(&a, &b);
                Ok(Node::bool(if self == Builtin::Eq { equal } else { !equal }))
            }
            Builtin::And => Ok(Node::bool(args.iter().all(Node::truthiness))),
            Builtin::Or => Ok(Node::bool(args.iter().any(Node::truthiness))),
            Builtin::Not => {
                let [value] = self.exactly::<1>(args, site)?;
                Ok(Node::bool(!value.truthiness()))
            }
            Builtin::Default => Ok(args
                .into_iter()
                .find(|arg| !arg.is_null())
                .unwrap_or_else(Node::null)),
            Builtin::Progn => Ok(args.into_iter().last().unwrap_or_else(Node::null)),
            Builtin::Pipeline => pipeline(engine, env, mode, args, site),
            Builtin::Include => include(engine, args),
            Builtin::Schema => {
                let [literal] = self.exactly::<1>(args, site)?;
                let schema = Schema::from_node(&literal)
                    .map_err(|err| EvaluationError::schema(err, literal.location()))?;
                Ok(Node::type_node(Rc::new(schema)))
            }
            Builtin::Merge => merge(args),
            Builtin::Patch => patch(args, site),
        }
    }

    fn exactly<const N: usize>(
        self,
        args: Vec<Node>,
        site: Option<&SourceInfo>,
    ) -> Result<[Node; N]> {
        let got = args.len();
        <[Node; N]>::try_from(args).map_err(|_| {
            EvaluationError::new(
                format!("{} expects {} arguments, got {}", self.name(), N, got),
                site,
            )
        })
    }

    fn arithmetic(self, args: Vec<Node>, site: Option<&SourceInfo>) -> Result<Node> {
        match (self, args.len()) {
            (Builtin::Sub, 0) => {
                return Err(EvaluationError::new("- expects at least 1 argument", site));
            }
            (Builtin::Div, 0 | 1) => {
                return Err(EvaluationError::new("/ expects at least 2 arguments", site));
            }
            _ => {}
        }
        match numbers(self, &args)? {
            Numbers::Ints(ints) => self.int_arithmetic(&ints, &args).map(Node::int),
            Numbers::Floats(floats) => self.float_arithmetic(&floats, &args).map(Node::float),
        }
    }

    fn int_arithmetic(self, ints: &[i64], args: &[Node]) -> Result<i64> {
        let overflow = |i: usize| EvaluationError::at(&args[i], "integer overflow");
        match self {
            Builtin::Add => ints.iter().enumerate().try_fold(0i64, |acc, (i, n)| {
                acc.checked_add(*n).ok_or_else(|| overflow(i))
            }),
            Builtin::Mul => ints.iter().enumerate().try_fold(1i64, |acc, (i, n)| {
                acc.checked_mul(*n).ok_or_else(|| overflow(i))
            }),
            Builtin::Sub if ints.len() == 1 => ints[0].checked_neg().ok_or_else(|| overflow(0)),
            Builtin::Sub => ints.iter().enumerate().skip(1).try_fold(ints[0], |acc, (i, n)| {
                acc.checked_sub(*n).ok_or_else(|| overflow(i))
            }),
            Builtin::Div => ints.iter().enumerate().skip(1).try_fold(ints[0], |acc, (i, n)| {
                if *n == 0 {
                    return Err(EvaluationError::at(&args[i], "division by zero"));
                }
                acc.checked_div(*n).ok_or_else(|| overflow(i))
            }),
            _ => unreachable!("not an arithmetic builtin"),
        }
    }

    fn float_arithmetic(self, floats: &[f64], args: &[Node]) -> Result<f64> {
        match self {
            Builtin::Add => Ok(floats.iter().sum()),
            Builtin::Mul => Ok(floats.iter().product()),
            Builtin::Sub if floats.len() == 1 => Ok(-floats[0]),
            Builtin::Sub => Ok(floats[1..].iter().fold(floats[0], |acc, n| acc - n)),
            Builtin::Div => floats
                .iter()
                .enumerate()
                .skip(1)
                .try_fold(floats[0], |acc, (i, n)| {
                    if *n == 0.0 {
                        return Err(EvaluationError::at(&args[i], "division by zero"));
                    }
                    Ok(acc / n)
                }),
            _ => unreachable!("not an arithmetic builtin"),
        }
    }

    fn compare(self, args: Vec<Node>, site: Option<&SourceInfo>) -> Result<Node> {
        let [a, b] = self.exactly::<2>(args, site)?;
        let ordering = match (&a.value, &b.value) {
            (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
            _ => as_float(self, &a)?.partial_cmp(&as_float(self, &b)?),
        };
        let Some(ordering) = ordering else {
            return Ok(Node::bool(false));
        };
        Ok(Node::bool(match self {
            Builtin::Lt => ordering.is_lt(),
            Builtin::Le => ordering.is_le(),
            Builtin::Gt => ordering.is_gt(),
            Builtin::Ge => ordering.is_ge(),
            _ => unreachable!("not a comparison builtin"),
        }))
    }
}

/// Operands of an arithmetic builtin, all of one numeric kind.
enum Numbers {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

fn numbers(builtin: Builtin, args: &[Node]) -> Result<Numbers> {
    let mut ints = Vec::new();
    let mut floats = Vec::new();
    for arg in args {
        match arg.value {
            Value::Int(i) => ints.push(i),
            Value::Float(f) => floats.push(f),
            _ => {
                return Err(EvaluationError::at(
                    arg,
                    format!(
                        "{} expects numbers, got {}",
                        builtin.name(),
                        arg.type_name()
                    ),
                ));
            }
        }
    }
    match (ints.is_empty(), floats.is_empty()) {
        (_, true) => Ok(Numbers::Ints(ints)),
        (true, false) => Ok(Numbers::Floats(floats)),
        (false, false) => {
            let first_float = args
                .iter()
                .find(|a| matches!(a.value, Value::Float(_)))
                .unwrap_or(&args[0]);
            Err(EvaluationError::at(
                first_float,
                format!("{} cannot mix int and float operands", builtin.name()),
            ))
        }
    }
}

fn as_float(builtin: Builtin, node: &Node) -> Result<f64> {
    match node.value {
        Value::Int(i) => Ok(i as f64),
        Value::Float(f) => Ok(f),
        _ => Err(EvaluationError::at(
            node,
            format!(
                "{} expects numbers, got {}",
                builtin.name(),
                node.type_name()
            ),
        )),
    }
}

/// Native equality, comparing integers and floats by value.
fn values_equal(a: &Node, b: &Node) -> bool {
    match (&a.value, &b.value) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        _ => a.to_native() == b.to_native(),
    }
}

fn pipeline(
    engine: &mut Engine,
    env: &Env,
    mode: Mode,
    args: Vec<Node>,
    site: Option<&SourceInfo>,
) -> Result<Node> {
    let mut args = args.into_iter();
    let Some(mut value) = args.next() else {
        return Err(EvaluationError::new(
            "pipeline expects a value and functions",
            site,
        ));
    };
    for function in args {
        value = engine
            .apply(&function, vec![value], env, mode)
            .map_err(|err| err.wrap("in pipeline stage", function.location()))?;
    }
    Ok(value)
}

/// Evaluate each listed file in a fresh environment and collect all of its
/// documents.
fn include(engine: &mut Engine, args: Vec<Node>) -> Result<Node> {
    let mut documents = Vec::new();
    for arg in args {
        let Some(relative) = arg.as_str() else {
            return Err(EvaluationError::at(
                &arg,
                format!("include expects file paths, got {}", arg.type_name()),
            ));
        };
        let path = resolve_path(relative, arg.location());
        debug!(path = %path.display(), "including file");
        let included = engine
            .load_file(&path, &Env::new(), arg.location())
            .map_err(|err| err.wrap(format!("in include of {}", relative), arg.location()))?;
        if let Value::Array(items) = included.value {
            documents.extend(items);
        }
    }
    Ok(Node::document_root(documents))
}

/// Fold `deep_merge` over the arguments, guided by the first attached
/// schema among them.
fn merge(args: Vec<Node>) -> Result<Node> {
    let schema = args.iter().find_map(|arg| arg.schema.clone());
    let mut merged = Node::null();
    for arg in args {
        merged = deep_merge(merged, arg, schema.as_deref())?;
    }
    if merged.schema.is_none() {
        merged.schema = schema;
    }
    Ok(merged)
}

/// Merge patches onto a target. Each patch is checked against the target's
/// schema without requiring its required properties.
fn patch(args: Vec<Node>, site: Option<&SourceInfo>) -> Result<Node> {
    let mut args = args.into_iter();
    let Some(mut target) = args.next() else {
        return Err(EvaluationError::new(
            "patch expects a target and patches",
            site,
        ));
    };
    let schema = target.schema.clone();
    for mut patch in args {
        if let Some(schema) = &schema {
            validate(&mut patch, schema, true).map_err(|err| {
                EvaluationError::validation(
                    format!("patch does not satisfy {}", schema.name()),
                    err,
                    patch.location(),
                )
            })?;
        }
        target = deep_merge(target, patch, schema.as_deref())?;
    }
    if target.schema.is_none() {
        target.schema = schema;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use serde_json::json;

    fn call(builtin: Builtin, args: Vec<Node>) -> Result<Node> {
        let mut engine = Engine::new(EngineOptions::default());
        builtin.call(&mut engine, &Env::new(), Mode::Eval, args, None)
    }

    fn ints(values: &[i64]) -> Vec<Node> {
        values.iter().copied().map(Node::int).collect()
    }

    #[test]
    fn test_names_round_trip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::from_name("if"), None);
    }

    #[test]
    fn test_int_arithmetic() {
        assert!(matches!(call(Builtin::Add, ints(&[1, 2, 3])).unwrap().value, Value::Int(6)));
        assert!(matches!(call(Builtin::Add, vec![]).unwrap().value, Value::Int(0)));
        assert!(matches!(call(Builtin::Mul, vec![]).unwrap().value, Value::Int(1)));
        assert!(matches!(call(Builtin::Sub, ints(&[5])).unwrap().value, Value::Int(-5)));
        assert!(matches!(call(Builtin::Sub, ints(&[10, 3, 2])).unwrap().value, Value::Int(5)));
        assert!(matches!(call(Builtin::Div, ints(&[7, 2])).unwrap().value, Value::Int(3)));
    }

    #[test]
    fn test_float_arithmetic() {
        let result = call(Builtin::Div, vec![Node::float(1.0), Node::float(4.0)]).unwrap();
        assert!(matches!(result.value, Value::Float(f) if f == 0.25));
    }

    #[test]
    fn test_arithmetic_errors() {
        let err = call(Builtin::Div, ints(&[1, 0])).unwrap_err();
        assert_eq!(err.message, "division by zero");

        let err = call(Builtin::Add, vec![Node::int(1), Node::float(1.5)]).unwrap_err();
        assert_eq!(err.message, "+ cannot mix int and float operands");

        let err = call(Builtin::Mul, vec![Node::int(1), Node::string("2")]).unwrap_err();
        assert_eq!(err.message, "* expects numbers, got string");

        let err = call(Builtin::Add, ints(&[i64::MAX, 1])).unwrap_err();
        assert_eq!(err.message, "integer overflow");

        let err = call(Builtin::Div, ints(&[1])).unwrap_err();
        assert_eq!(err.message, "/ expects at least 2 arguments");
    }

    #[test]
    fn test_comparisons_promote() {
        let lt = call(Builtin::Lt, vec![Node::int(1), Node::float(1.5)]).unwrap();
        assert!(matches!(lt.value, Value::Bool(true)));
        let ge = call(Builtin::Ge, ints(&[2, 2])).unwrap();
        assert!(matches!(ge.value, Value::Bool(true)));

        let err = call(Builtin::Gt, ints(&[1])).unwrap_err();
        assert_eq!(err.message, "> expects 2 arguments, got 1");
    }

    #[test]
    fn test_equality() {
        let eq = call(Builtin::Eq, vec![Node::int(2), Node::float(2.0)]).unwrap();
        assert!(matches!(eq.value, Value::Bool(true)));
        let eq = call(
            Builtin::Eq,
            vec![
                Node::from_json(&json!({"a": [1]})),
                Node::from_json(&json!({"a": [1]})),
            ],
        )
        .unwrap();
        assert!(matches!(eq.value, Value::Bool(true)));
        let ne = call(Builtin::Ne, vec![Node::string("a"), Node::string("b")]).unwrap();
        assert!(matches!(ne.value, Value::Bool(true)));
    }

    #[test]
    fn test_logic_and_default() {
        let and = call(Builtin::And, vec![Node::bool(true), Node::int(0)]).unwrap();
        assert!(matches!(and.value, Value::Bool(false)));
        let or = call(Builtin::Or, vec![Node::null(), Node::string("x")]).unwrap();
        assert!(matches!(or.value, Value::Bool(true)));
        let not = call(Builtin::Not, vec![Node::array(vec![])]).unwrap();
        assert!(matches!(not.value, Value::Bool(true)));

        let value = call(
            Builtin::Default,
            vec![Node::null(), Node::int(0), Node::int(1)],
        )
        .unwrap();
        assert!(matches!(value.value, Value::Int(0)));
        assert!(call(Builtin::Default, vec![Node::null()]).unwrap().is_null());
    }

    #[test]
    fn test_progn_returns_last() {
        assert!(matches!(call(Builtin::Progn, ints(&[1, 2, 3])).unwrap().value, Value::Int(3)));
        assert!(call(Builtin::Progn, vec![]).unwrap().is_null());
    }

    #[test]
    fn test_schema_builds_type() {
        let literal = Node::from_json(&json!({"type": "object", "required": ["name"]}));
        let node = call(Builtin::Schema, vec![literal]).unwrap();
        match &node.value {
            Value::Type(schema) => assert_eq!(schema.type_name(), "object"),
            other => panic!("expected a type, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_folds_from_null() {
        let merged = call(
            Builtin::Merge,
            vec![
                Node::from_json(&json!({"a": 1, "b": {"c": 1}})),
                Node::from_json(&json!({"b": {"d": 2}})),
                Node::from_json(&json!({"e": 3})),
            ],
        )
        .unwrap();
        assert_eq!(merged.to_json(), json!({"a": 1, "b": {"c": 1, "d": 2}, "e": 3}));
    }

    #[test]
    fn test_patch_validates_partially() {
        let schema = Rc::new(
            Schema::from_node(&Node::from_json(&json!({
                "type": "object",
                "required": ["name", "replicas"],
                "properties": {
                    "name": {"type": "string"},
                    "replicas": {"type": "integer"}
                }
            })))
            .unwrap(),
        );
        let target = Node::from_json(&json!({"name": "web", "replicas": 1})).with_schema(schema);

        let patched = call(
            Builtin::Patch,
            vec![target.clone(), Node::from_json(&json!({"replicas": 3}))],
        )
        .unwrap();
        assert_eq!(patched.to_json(), json!({"name": "web", "replicas": 3}));
        assert!(patched.schema.is_some());

        let err = call(
            Builtin::Patch,
            vec![target, Node::from_json(&json!({"replicas": "three"}))],
        )
        .unwrap_err();
        assert_eq!(err.message, "patch does not satisfy object");
    }
}
