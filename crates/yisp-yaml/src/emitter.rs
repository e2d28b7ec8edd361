//! YAML emitter for [`YamlNode`] documents.
//!
//! Writes block style with two-space indentation. Flow collections, scalar
//! styles, tags, anchors and comments are written back the way they were
//! parsed whenever that is still valid for the value.

use crate::scalar::is_ambiguous;
use crate::{Scalar, Style, YamlKind, YamlNode};
use std::fmt::Write;

const INDENT: usize = 2;

/// Emit a multi-document stream. Documents are separated by `---`.
pub fn emit_documents(documents: &[YamlNode]) -> String {
    let mut out = String::new();
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&emit(doc));
    }
    out
}

/// Emit a single document.
pub fn emit(node: &YamlNode) -> String {
    let mut emitter = Emitter::default();
    emitter.document(node);
    emitter.out
}

#[derive(Default)]
struct Emitter {
    out: String,
}

impl Emitter {
    fn document(&mut self, node: &YamlNode) {
        self.comment_lines(node.comments.head.as_deref(), 0);
        if self.is_block(node) {
            let props = props(node);
            if !props.is_empty() {
                self.out.push_str(&props);
                self.out.push('\n');
            }
            self.block(node, 0);
        } else {
            let value = self.inline(node);
            self.out.push_str(&value);
            self.line_comment(node);
            self.out.push('\n');
        }
        self.comment_lines(node.comments.foot.as_deref(), 0);
    }

    fn block(&mut self, node: &YamlNode, indent: usize) {
        match &node.kind {
            YamlKind::Mapping(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 || !self.out.ends_with("- ") {
                        self.comment_lines(entry.key.comments.head.as_deref(), indent);
                        self.pad(indent);
                    }
                    self.entry(&entry.key, &entry.value, indent);
                }
            }
            YamlKind::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 || !self.out.ends_with("- ") {
                        self.comment_lines(item.comments.head.as_deref(), indent);
                        self.pad(indent);
                    }
                    self.out.push_str("- ");
                    self.item(item, indent);
                }
            }
            YamlKind::Scalar(_) | YamlKind::Alias(_) => {}
        }
    }

    fn entry(&mut self, key: &YamlNode, value: &YamlNode, indent: usize) {
        let key_text = self.inline(key);
        self.out.push_str(&key_text);
        self.out.push(':');

        if self.is_block(value) {
            let props = props(value);
            if !props.is_empty() {
                self.out.push(' ');
                self.out.push_str(&props);
            }
            self.line_comment(key);
            self.out.push('\n');
            let child = indent + INDENT;
            self.comment_lines(value.comments.head.as_deref(), child);
            self.block(value, child);
            self.comment_lines(value.comments.foot.as_deref(), child);
        } else if self.is_block_scalar(value) {
            self.out.push(' ');
            self.block_scalar(value, indent);
        } else {
            let text = self.inline(value);
            self.out.push(' ');
            self.out.push_str(&text);
            if value.comments.line.is_some() {
                self.line_comment(value);
            } else {
                self.line_comment(key);
            }
            self.out.push('\n');
        }
    }

    /// Write a sequence item after its `- `.
    fn item(&mut self, item: &YamlNode, indent: usize) {
        let child = indent + INDENT;
        if self.is_block(item) {
            let props = props(item);
            if !props.is_empty() {
                self.out.push_str(&props);
                self.out.push('\n');
            }
            self.block(item, child);
            self.comment_lines(item.comments.foot.as_deref(), child);
        } else if self.is_block_scalar(item) {
            self.block_scalar(item, indent);
        } else {
            let text = self.inline(item);
            self.out.push_str(&text);
            self.line_comment(item);
            self.out.push('\n');
        }
    }

    fn block_scalar(&mut self, node: &YamlNode, indent: usize) {
        let YamlKind::Scalar(Scalar::String(text)) = &node.kind else {
            return;
        };
        let props = props(node);
        if !props.is_empty() {
            self.out.push_str(&props);
            self.out.push(' ');
        }

        let body = text.trim_end_matches('\n');
        let indicator = if node.style == Style::Folded && !body.contains('\n') {
            '>'
        } else {
            '|'
        };
        let trailing = text.len() - body.len();
        let chomp = match trailing {
            0 => "-",
            1 => "",
            _ => "+",
        };
        self.out.push(indicator);
        self.out.push_str(chomp);
        self.line_comment(node);
        self.out.push('\n');

        let child = indent + INDENT;
        let mut lines: Vec<&str> = body.split('\n').collect();
        if chomp == "+" {
            lines.extend(std::iter::repeat_n("", trailing - 1));
        }
        for line in lines {
            if !line.is_empty() {
                self.pad(child);
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }

    /// Text of a node that fits on one line.
    fn inline(&self, node: &YamlNode) -> String {
        let mut text = props(node);
        if !text.is_empty() {
            text.push(' ');
        }
        let tagged = node.tag.is_some();
        match &node.kind {
            YamlKind::Alias(name) => {
                let _ = write!(text, "*{}", name);
            }
            YamlKind::Scalar(scalar) => {
                text.push_str(&scalar_text(scalar, node.style, false, tagged))
            }
            YamlKind::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(|i| self.flow(i)).collect();
                let _ = write!(text, "[{}]", parts.join(", "));
            }
            YamlKind::Mapping(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{}: {}", self.flow(&e.key), self.flow(&e.value)))
                    .collect();
                if parts.is_empty() {
                    text.push_str("{}");
                } else {
                    let _ = write!(text, "{{{}}}", parts.join(", "));
                }
            }
        }
        text
    }

    /// Text of a node inside a flow collection.
    fn flow(&self, node: &YamlNode) -> String {
        match &node.kind {
            YamlKind::Scalar(scalar) => {
                let mut text = props(node);
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&scalar_text(scalar, node.style, true, node.tag.is_some()));
                text
            }
            _ => self.inline(node),
        }
    }

    /// Collections written in block style: non-empty, not flow, or flow
    /// but holding comments that flow style cannot carry.
    fn is_block(&self, node: &YamlNode) -> bool {
        match &node.kind {
            YamlKind::Sequence(items) => {
                !items.is_empty()
                    && (node.style != Style::Flow || items.iter().any(has_comments))
            }
            YamlKind::Mapping(entries) => {
                !entries.is_empty()
                    && (node.style != Style::Flow
                        || entries.iter().any(|e| has_comments(&e.key) || has_comments(&e.value)))
            }
            YamlKind::Scalar(_) | YamlKind::Alias(_) => false,
        }
    }

    fn is_block_scalar(&self, node: &YamlNode) -> bool {
        match &node.kind {
            YamlKind::Scalar(Scalar::String(s)) => {
                let multiline = s.trim_end_matches('\n').contains('\n') || s.ends_with('\n');
                let block_style = matches!(node.style, Style::Literal | Style::Folded);
                let first_line_ok = !s.starts_with(' ') && !s.starts_with('\t');
                let no_control = !s.chars().any(|c| c.is_control() && c != '\n');
                (block_style || (multiline && node.style == Style::Plain))
                    && first_line_ok
                    && no_control
                    && !s.is_empty()
            }
            _ => false,
        }
    }

    fn comment_lines(&mut self, comment: Option<&str>, indent: usize) {
        if let Some(comment) = comment {
            for line in comment.lines() {
                self.pad(indent);
                self.out.push_str(line);
                self.out.push('\n');
            }
        }
    }

    fn line_comment(&mut self, node: &YamlNode) {
        if let Some(comment) = &node.comments.line {
            self.out.push(' ');
            self.out.push_str(comment);
        }
    }

    fn pad(&mut self, indent: usize) {
        for _ in 0..indent {
            self.out.push(' ');
        }
    }
}

fn has_comments(node: &YamlNode) -> bool {
    !node.comments.is_empty()
}

/// Tag and anchor written before a node.
fn props(node: &YamlNode) -> String {
    let mut parts = Vec::new();
    if let Some(anchor) = &node.anchor {
        parts.push(format!("&{}", anchor));
    }
    if let Some(tag) = &node.tag {
        parts.push(tag.clone());
    }
    parts.join(" ")
}

/// `tagged` scalars carry their type in the tag, so text that would
/// otherwise resolve to a number or bool needs no quotes.
fn scalar_text(scalar: &Scalar, style: Style, in_flow: bool, tagged: bool) -> String {
    match scalar {
        Scalar::Null => "null".to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => float_text(*f),
        Scalar::String(s) => string_text(s, style, in_flow, tagged),
    }
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        return ".nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    let text = f.to_string();
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{}.0", text)
    }
}

fn string_text(s: &str, style: Style, in_flow: bool, tagged: bool) -> String {
    let needs_double = s.chars().any(|c| c.is_control());
    match style {
        Style::DoubleQuoted => double_quoted(s),
        Style::SingleQuoted if !needs_double => single_quoted(s),
        _ if needs_double => double_quoted(s),
        _ if needs_quotes(s, in_flow, tagged) => single_quoted(s),
        _ => s.to_string(),
    }
}

fn needs_quotes(s: &str, in_flow: bool, tagged: bool) -> bool {
    if s.is_empty() || (!tagged && is_ambiguous(s)) {
        return true;
    }
    let first = s.chars().next().unwrap_or(' ');
    if matches!(
        first,
        '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`'
    ) {
        // `-x`, `:x` and `?x` are fine outside flow context
        let second = s.chars().nth(1);
        let indicator_only = matches!(first, '-' | '?' | ':')
            && second.is_some_and(|c| !c.is_whitespace())
            && !in_flow;
        if !indicator_only {
            return true;
        }
    }
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        return true;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return true;
    }
    in_flow && s.contains([',', '[', ']', '{', '}'])
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
