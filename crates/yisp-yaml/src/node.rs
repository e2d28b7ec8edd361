//! The YAML document model.

use crate::SourceInfo;

/// A YAML node with its properties, comments and source location.
///
/// Mappings keep their entries as an ordered list, so duplicate keys (most
/// importantly repeated `<<` merge keys) survive parsing and are left for
/// the consumer to interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlNode {
    pub kind: YamlKind,

    /// Tag as written, including the leading `!` (`!yisp`, `!!int`, `!Pod`)
    pub tag: Option<String>,

    /// Anchor name (without `&`)
    pub anchor: Option<String>,

    pub style: Style,

    pub comments: Comments,

    pub source_info: SourceInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum YamlKind {
    Scalar(Scalar),
    Sequence(Vec<YamlNode>),
    Mapping(Vec<YamlEntry>),
    /// `*name`, kept unresolved
    Alias(String),
}

/// A resolved scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct YamlEntry {
    pub key: YamlNode,
    pub value: YamlNode,
}

/// Presentation style of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// Plain scalars and block collections
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
    /// `[...]` and `{...}` collections
    Flow,
}

/// Comments attached to a node. Each is stored with its `#` markers, one
/// comment line per text line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Comments {
    /// Comment lines directly above the node
    pub head: Option<String>,
    /// Trailing comment on the node's own line
    pub line: Option<String>,
    /// Comment lines after the node
    pub foot: Option<String>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.line.is_none() && self.foot.is_none()
    }
}

impl YamlNode {
    pub fn new(kind: YamlKind, source_info: SourceInfo) -> Self {
        Self {
            kind,
            tag: None,
            anchor: None,
            style: Style::Plain,
            comments: Comments::default(),
            source_info,
        }
    }

    pub fn scalar(value: Scalar) -> Self {
        Self::new(YamlKind::Scalar(value), SourceInfo::default())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::scalar(Scalar::String(value.into()))
    }

    pub fn null() -> Self {
        Self::scalar(Scalar::Null)
    }

    pub fn sequence(items: Vec<YamlNode>) -> Self {
        Self::new(YamlKind::Sequence(items), SourceInfo::default())
    }

    pub fn mapping(entries: Vec<YamlEntry>) -> Self {
        Self::new(YamlKind::Mapping(entries), SourceInfo::default())
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_comments(mut self, comments: Comments) -> Self {
        self.comments = comments;
        self
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, YamlKind::Scalar(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, YamlKind::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, YamlKind::Sequence(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            YamlKind::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[YamlNode]> {
        match &self.kind {
            YamlKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[YamlEntry]> {
        match &self.kind {
            YamlKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up the value of the last entry whose key is the string `key`.
    pub fn get(&self, key: &str) -> Option<&YamlNode> {
        self.as_mapping()?
            .iter()
            .rev()
            .find(|e| e.key.as_str() == Some(key))
            .map(|e| &e.value)
    }

    /// Number of items in a collection, 0 for scalars and aliases.
    pub fn len(&self) -> usize {
        match &self.kind {
            YamlKind::Sequence(items) => items.len(),
            YamlKind::Mapping(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl YamlEntry {
    pub fn new(key: YamlNode, value: YamlNode) -> Self {
        Self { key, value }
    }
}
