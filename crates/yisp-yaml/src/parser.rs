//! YAML parser that builds [`YamlNode`] documents.

use crate::lexer::{CommentLine, PositionMap, prescan, rewrite_aliases};
use crate::scalar::resolve_plain;
use crate::{Error, Result, Scalar, SourceInfo, Style, YamlEntry, YamlKind, YamlNode};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Parse the first YAML document of a string.
///
/// # Example
///
/// ```rust
/// use yisp_yaml::parse;
///
/// let yaml = parse("title: My Document").unwrap();
/// assert!(yaml.is_mapping());
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid or contains no document.
pub fn parse(content: &str) -> Result<YamlNode> {
    first_document(parse_documents(content, None)?)
}

/// Parse the first YAML document of a string with an associated filename.
///
/// ```rust
/// use yisp_yaml::parse_file;
///
/// let yaml = parse_file("title: My Document", "config.yaml").unwrap();
/// assert_eq!(yaml.source_info.file.as_deref(), Some("config.yaml"));
/// ```
pub fn parse_file(content: &str, filename: &str) -> Result<YamlNode> {
    first_document(parse_documents(content, Some(filename))?)
}

/// Parse every document of a YAML stream.
///
/// An empty stream yields no documents.
pub fn parse_documents(content: &str, filename: Option<&str>) -> Result<Vec<YamlNode>> {
    let scan = prescan(content);
    let rewritten = rewrite_aliases(content, &scan.aliases);
    let positions = PositionMap::new(scan.aliases);
    let filename: Option<Arc<str>> = filename.map(Arc::from);

    let mut parser = Parser::new_from_str(&rewritten);
    let mut builder = YamlBuilder::new(&rewritten, filename.clone(), &positions, scan.anchors);

    if let Err(err) = parser.load(&mut builder, true) {
        let pos = positions.locate(err.marker());
        let location = SourceInfo::new(filename, pos.offset, pos.line + 1, pos.col + 1, 0);
        return Err(Error::ParseError {
            message: format!("{} at line {} column {}", err.info(), pos.line + 1, pos.col + 1),
            location: Some(location),
        });
    }

    let mut documents = builder.result()?;
    attach_comments(&mut documents, &scan.comments);
    Ok(documents)
}

fn first_document(documents: Vec<YamlNode>) -> Result<YamlNode> {
    documents
        .into_iter()
        .next()
        .ok_or_else(|| Error::ParseError {
            message: "No YAML document found".into(),
            location: None,
        })
}

/// Builder that implements MarkedEventReceiver to construct documents.
struct YamlBuilder<'a> {
    source: Vec<char>,
    filename: Option<Arc<str>>,
    positions: &'a PositionMap,

    /// Anchor names from the pre-pass, consumed in order
    anchor_names: std::vec::IntoIter<String>,
    /// Parser anchor ids seen so far
    anchors_by_id: HashMap<usize, String>,

    stack: Vec<BuildNode>,
    documents: Vec<YamlNode>,
    error: Option<Error>,
}

/// A collection being constructed during parsing.
enum BuildNode {
    Sequence {
        start: SourceInfo,
        props: Props,
        items: Vec<YamlNode>,
    },
    Mapping {
        start: SourceInfo,
        props: Props,
        entries: Vec<YamlEntry>,
        pending_key: Option<YamlNode>,
    },
}

struct Props {
    tag: Option<String>,
    anchor: Option<String>,
    flow: bool,
}

impl<'a> YamlBuilder<'a> {
    fn new(
        source: &str,
        filename: Option<Arc<str>>,
        positions: &'a PositionMap,
        anchor_names: Vec<String>,
    ) -> Self {
        Self {
            source: source.chars().collect(),
            filename,
            positions,
            anchor_names: anchor_names.into_iter(),
            anchors_by_id: HashMap::new(),
            stack: Vec::new(),
            documents: Vec::new(),
            error: None,
        }
    }

    fn result(self) -> Result<Vec<YamlNode>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.documents),
        }
    }

    fn push_complete(&mut self, node: YamlNode) {
        match self.stack.last_mut() {
            None => self.documents.push(node),
            Some(BuildNode::Sequence { items, .. }) => items.push(node),
            Some(BuildNode::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => entries.push(YamlEntry::new(key, node)),
                None => *pending_key = Some(node),
            },
        }
    }

    fn make_source_info(&self, marker: &Marker, len: usize) -> SourceInfo {
        let pos = self.positions.locate(marker);
        SourceInfo::new(self.filename.clone(), pos.offset, pos.line + 1, pos.col + 1, len)
    }

    fn anchor_name(&mut self, id: usize) -> Option<String> {
        if id == 0 {
            return None;
        }
        if let Some(name) = self.anchors_by_id.get(&id) {
            return Some(name.clone());
        }
        let name = self.anchor_names.next().unwrap_or_else(|| format!("anchor{}", id));
        self.anchors_by_id.insert(id, name.clone());
        Some(name)
    }

    fn props(&mut self, marker: &Marker, anchor_id: usize, tag: Option<Tag>, open: char) -> Props {
        Props {
            tag: tag.map(tag_to_string),
            anchor: self.anchor_name(anchor_id),
            flow: self.opens_with(marker.index(), open),
        }
    }

    /// Whether the collection starting at `index` opens with `open`,
    /// skipping any anchor and tag written before it.
    fn opens_with(&self, mut index: usize, open: char) -> bool {
        while let Some(c) = self.source.get(index) {
            match c {
                '&' | '!' => {
                    while self.source.get(index).is_some_and(|c| !c.is_whitespace()) {
                        index += 1;
                    }
                }
                c if c.is_whitespace() => index += 1,
                c => return *c == open,
            }
        }
        false
    }

    fn scalar_node(
        &mut self,
        value: String,
        style: TScalarStyle,
        anchor_id: usize,
        tag: Option<Tag>,
        marker: &Marker,
    ) -> YamlNode {
        let tag = tag.map(tag_to_string);
        let style = match style {
            TScalarStyle::SingleQuoted => Style::SingleQuoted,
            TScalarStyle::DoubleQuoted => Style::DoubleQuoted,
            TScalarStyle::Literal => Style::Literal,
            TScalarStyle::Folded => Style::Folded,
            _ => Style::Plain,
        };

        if let Some(name) = tag.as_deref().and_then(|t| t.strip_prefix("!*"))
            && value.is_empty()
        {
            let source_info = self.make_source_info(marker, name.chars().count() + 1);
            return YamlNode::new(YamlKind::Alias(name.to_string()), source_info);
        }

        let quoted = matches!(style, Style::SingleQuoted | Style::DoubleQuoted);
        let len = value.chars().count() + if quoted { 2 } else { 0 };
        let source_info = self.make_source_info(marker, len);

        // standard tags are coerced by the consumer, so keep their raw text
        let standard_tag = tag.as_deref().is_some_and(|t| t.starts_with("!!"));
        let scalar = if style == Style::Plain && !standard_tag {
            resolve_plain(&value)
        } else {
            Scalar::String(value)
        };

        let mut node = YamlNode::new(YamlKind::Scalar(scalar), source_info).with_style(style);
        node.tag = tag;
        node.anchor = self.anchor_name(anchor_id);
        node
    }

    fn finish_collection(&mut self, marker: &Marker) {
        let Some(build_node) = self.stack.pop() else {
            self.fail("collection end without a start", marker);
            return;
        };
        let end = self.positions.locate(marker).offset;
        let (kind, start, props) = match build_node {
            BuildNode::Sequence { start, props, items } => (YamlKind::Sequence(items), start, props),
            BuildNode::Mapping {
                start,
                props,
                entries,
                pending_key,
            } => {
                if pending_key.is_some() {
                    self.fail("mapping key without a value", marker);
                    return;
                }
                (YamlKind::Mapping(entries), start, props)
            }
        };
        let mut source_info = start;
        source_info.len = end.saturating_sub(source_info.offset);

        let mut node = YamlNode::new(kind, source_info);
        node.tag = props.tag;
        node.anchor = props.anchor;
        if props.flow {
            node.style = Style::Flow;
        }
        self.push_complete(node);
    }

    fn fail(&mut self, message: &str, marker: &Marker) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure {
                message: message.to_string(),
                location: Some(self.make_source_info(marker, 0)),
            });
        }
    }
}

impl MarkedEventReceiver for YamlBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor_id, tag) => {
                let node = self.scalar_node(value, style, anchor_id, tag, &marker);
                self.push_complete(node);
            }

            Event::SequenceStart(anchor_id, tag) => {
                let props = self.props(&marker, anchor_id, tag, '[');
                let start = self.make_source_info(&marker, 0);
                self.stack.push(BuildNode::Sequence {
                    start,
                    props,
                    items: Vec::new(),
                });
            }

            Event::MappingStart(anchor_id, tag) => {
                let props = self.props(&marker, anchor_id, tag, '{');
                let start = self.make_source_info(&marker, 0);
                self.stack.push(BuildNode::Mapping {
                    start,
                    props,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }

            Event::SequenceEnd | Event::MappingEnd => self.finish_collection(&marker),

            Event::Alias(anchor_id) => {
                let name = self.anchors_by_id.get(&anchor_id).cloned().unwrap_or_default();
                let len = name.chars().count() + 1;
                let source_info = self.make_source_info(&marker, len);
                self.push_complete(YamlNode::new(YamlKind::Alias(name), source_info));
            }
        }
    }
}

/// Render a parsed tag the way it was written: `!name`, `!!name`, or the
/// full handle for anything else.
fn tag_to_string(tag: Tag) -> String {
    match tag.handle.as_str() {
        "!" => format!("!{}", tag.suffix),
        "!!" | "tag:yaml.org,2002:" => format!("!!{}", tag.suffix),
        handle => format!("{}{}", handle, tag.suffix),
    }
}

/// Attach head, line and foot comments to the parsed documents.
///
/// A block of full-line comments belongs to the first node that starts on
/// the next non-blank line. A trailing comment belongs to the last node that
/// starts on its line. Anything left over becomes the foot comment of the
/// document it appears in.
fn attach_comments(documents: &mut [YamlNode], comments: &[CommentLine]) {
    if comments.is_empty() || documents.is_empty() {
        return;
    }

    let mut heads: BTreeMap<usize, (usize, Vec<String>)> = BTreeMap::new();
    let mut lines: HashMap<usize, String> = HashMap::new();
    let mut block: Vec<&CommentLine> = Vec::new();
    for (i, comment) in comments.iter().enumerate() {
        if !comment.full_line {
            lines.insert(comment.line, comment.text.clone());
            continue;
        }
        block.push(comment);
        let next = comments.get(i + 1);
        let continues = next.is_some_and(|n| n.full_line && n.line == comment.line + 1);
        if !continues {
            let first_line = block[0].line;
            let texts = block.iter().map(|c| c.text.clone()).collect();
            heads.insert(comment.line + 1, (first_line, texts));
            block.clear();
        }
    }

    for doc in documents.iter_mut() {
        claim_heads(doc, &mut heads);
        claim_line_comments(doc, &mut lines);
    }

    // unclaimed blocks: foot of the last document starting at or before them
    for (_, (first_line, texts)) in heads {
        let index = documents
            .iter()
            .rposition(|d| d.source_info.line <= first_line)
            .unwrap_or(0);
        let foot = &mut documents[index].comments.foot;
        let text = texts.join("\n");
        *foot = Some(match foot.take() {
            Some(existing) => format!("{}\n{}", existing, text),
            None => text,
        });
    }
}

/// Give each node the comment block ending right above it (blank lines in
/// between are allowed).
fn claim_heads(node: &mut YamlNode, heads: &mut BTreeMap<usize, (usize, Vec<String>)>) {
    let line = node.source_info.line;
    let candidate = heads
        .range(..=line)
        .next_back()
        .map(|(target, _)| *target);
    if let Some(target) = candidate
        && target <= line
        && node.comments.head.is_none()
        && heads_reach(target, line)
        && let Some((_, texts)) = heads.remove(&target)
    {
        node.comments.head = Some(texts.join("\n"));
    }

    match &mut node.kind {
        YamlKind::Sequence(items) => {
            for item in items {
                claim_heads(item, heads);
            }
        }
        YamlKind::Mapping(entries) => {
            for entry in entries {
                claim_heads(&mut entry.key, heads);
                claim_heads(&mut entry.value, heads);
            }
        }
        YamlKind::Scalar(_) | YamlKind::Alias(_) => {}
    }
}

/// Blocks attach across at most one blank line.
fn heads_reach(target: usize, line: usize) -> bool {
    line - target <= 1
}

fn claim_line_comments(node: &mut YamlNode, lines: &mut HashMap<usize, String>) {
    if node.style != Style::Flow {
        match &mut node.kind {
            YamlKind::Sequence(items) => {
                for item in items.iter_mut().rev() {
                    claim_line_comments(item, lines);
                }
            }
            YamlKind::Mapping(entries) => {
                for entry in entries.iter_mut().rev() {
                    claim_line_comments(&mut entry.value, lines);
                    claim_line_comments(&mut entry.key, lines);
                }
            }
            YamlKind::Scalar(_) | YamlKind::Alias(_) => {}
        }
    }
    if node.comments.line.is_none()
        && let Some(text) = lines.remove(&node.source_info.line)
    {
        node.comments.line = Some(text);
    }
}
