//! The evaluator's value model.
//!
//! Every value flowing through the engine is a [`Node`]: a [`Value`] plus the
//! YAML properties it was written with (tag, anchor), presentation
//! attributes carried through to the output, and an optional attached
//! [`Schema`].

use crate::env::Env;
use crate::schema::Schema;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use yisp_source_map::SourceInfo;
use yisp_yaml::{Comments, Style};

/// The payload of a node.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    Map(IndexMap<String, Node>),
    /// A reference to a binding, written as a YAML alias
    Symbol(String),
    /// A lambda parameter name
    Parameter(String),
    Lambda(Rc<Lambda>),
    Type(Rc<Schema>),
}

/// The kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Map,
    Symbol,
    Parameter,
    Lambda,
    Type,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Symbol => "symbol",
            Kind::Parameter => "parameter",
            Kind::Lambda => "lambda",
            Kind::Type => "type",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Presentation attributes carried from the input to the output.
#[derive(Debug, Clone, Default)]
pub struct Attr {
    /// Every source location this value was assembled from. Merges
    /// accumulate the locations of both sides.
    pub sources: Vec<SourceInfo>,
    pub comments: Comments,
    pub style: Style,
    /// Comments written on the mapping key this value was bound to
    pub key_comments: Comments,
    pub key_style: Style,
}

impl Attr {
    pub fn at(source: SourceInfo) -> Self {
        Attr {
            sources: vec![source],
            ..Default::default()
        }
    }

    /// The primary source location.
    pub fn location(&self) -> Option<&SourceInfo> {
        self.sources.first()
    }
}

/// A function value: parameters, optional return type, an unevaluated body
/// and the environment captured where it was created.
#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub returns: Option<Rc<Schema>>,
    pub body: Node,
    pub closure: Env,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub schema: Option<Rc<Schema>>,
}

/// A value in the engine.
#[derive(Debug, Clone)]
pub struct Node {
    pub value: Value,
    /// Tag as written, including the leading `!`
    pub tag: Option<String>,
    pub anchor: Option<String>,
    pub attr: Attr,
    /// Set on arrays that hold whole output documents
    pub is_document_root: bool,
    pub schema: Option<Rc<Schema>>,
}

/// A plain host-language projection of a node, used for equality and JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Native>),
    Map(IndexMap<String, Native>),
}

impl Node {
    pub fn new(value: Value) -> Self {
        Node {
            value,
            tag: None,
            anchor: None,
            attr: Attr::default(),
            is_document_root: false,
            schema: None,
        }
    }

    pub fn null() -> Self {
        Node::new(Value::Null)
    }

    pub fn bool(b: bool) -> Self {
        Node::new(Value::Bool(b))
    }

    pub fn int(i: i64) -> Self {
        Node::new(Value::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Node::new(Value::Float(f))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::new(Value::String(s.into()))
    }

    pub fn array(items: Vec<Node>) -> Self {
        Node::new(Value::Array(items))
    }

    pub fn map(entries: IndexMap<String, Node>) -> Self {
        Node::new(Value::Map(entries))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Node::new(Value::Symbol(name.into()))
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Node::new(Value::Parameter(name.into()))
    }

    pub fn lambda(lambda: Lambda) -> Self {
        Node::new(Value::Lambda(Rc::new(lambda)))
    }

    pub fn type_node(schema: Rc<Schema>) -> Self {
        Node::new(Value::Type(schema))
    }

    /// An array whose items are output documents.
    pub fn document_root(items: Vec<Node>) -> Self {
        let mut node = Node::array(items);
        node.is_document_root = true;
        node
    }

    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attr = attr;
        self
    }

    pub fn with_schema(mut self, schema: Rc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn kind(&self) -> Kind {
        match &self.value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Symbol(_) => Kind::Symbol,
            Value::Parameter(_) => Kind::Parameter,
            Value::Lambda(_) => Kind::Lambda,
            Value::Type(_) => Kind::Type,
        }
    }

    /// Name of the value's kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn location(&self) -> Option<&SourceInfo> {
        self.attr.location()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match &self.value {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Truthiness: null, false, zero, the empty string and empty
    /// collections are false. Everything else is true.
    pub fn truthiness(&self) -> bool {
        match &self.value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Symbol(_) | Value::Parameter(_) | Value::Lambda(_) | Value::Type(_) => true,
        }
    }

    /// Project to a [`Native`] value. Values with no data representation
    /// become descriptive placeholder strings.
    pub fn to_native(&self) -> Native {
        match &self.value {
            Value::Null => Native::Null,
            Value::Bool(b) => Native::Bool(*b),
            Value::Int(i) => Native::Int(*i),
            Value::Float(f) => Native::Float(*f),
            Value::String(s) => Native::String(s.clone()),
            Value::Array(items) => Native::Array(items.iter().map(Node::to_native).collect()),
            Value::Map(map) => Native::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_native()))
                    .collect(),
            ),
            Value::Symbol(_) | Value::Parameter(_) | Value::Lambda(_) | Value::Type(_) => {
                Native::String(self.placeholder())
            }
        }
    }

    /// The text written in place of a value that cannot be rendered as data.
    pub fn placeholder(&self) -> String {
        match &self.value {
            Value::Symbol(name) => format!("<symbol {}>", name),
            Value::Parameter(name) => format!("<parameter {}>", name),
            Value::Lambda(_) => "<lambda>".to_string(),
            Value::Type(schema) => format!("<type {}>", schema.name()),
            _ => String::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.to_native().to_json()
    }

    /// Build a node from JSON, e.g. a schema default.
    pub fn from_json(value: &serde_json::Value) -> Node {
        use serde_json::Value as J;
        match value {
            J::Null => Node::null(),
            J::Bool(b) => Node::bool(*b),
            J::Number(n) => match n.as_i64() {
                Some(i) => Node::int(i),
                None => Node::float(n.as_f64().unwrap_or(f64::NAN)),
            },
            J::String(s) => Node::string(s.clone()),
            J::Array(items) => Node::array(items.iter().map(Node::from_json).collect()),
            J::Object(map) => Node::map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Node::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl Native {
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Native::Null => J::Null,
            Native::Bool(b) => J::Bool(*b),
            Native::Int(i) => J::Number((*i).into()),
            Native::Float(f) => serde_json::Number::from_f64(*f).map_or(J::Null, J::Number),
            Native::String(s) => J::String(s.clone()),
            Native::Array(items) => J::Array(items.iter().map(Native::to_json).collect()),
            Native::Map(map) => J::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => f.write_str(s),
            Value::Symbol(_) | Value::Parameter(_) | Value::Lambda(_) | Value::Type(_) => {
                f.write_str(&self.placeholder())
            }
            _ => write!(f, "{}", self.to_json()),
        }
    }
}
