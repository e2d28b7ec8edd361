//! Lexical pre-pass over YAML source.
//!
//! Collects anchor names in source order, alias sites, and comments. It is
//! not a full YAML scanner: it tracks just enough state (quoted scalars,
//! block scalars, flow depth, plain scalars) to avoid misreading `&`, `*`
//! and `#` inside values.

use yaml_rust2::scanner::Marker;

#[derive(Debug, Default)]
pub(crate) struct Prescan {
    /// Anchor names in the order they appear
    pub anchors: Vec<String>,
    pub aliases: Vec<AliasSite>,
    pub comments: Vec<CommentLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AliasSite {
    pub name: String,
    /// Character offset of the `*`
    pub offset: usize,
    /// 0-based line
    pub line: usize,
    /// 0-based column in characters
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommentLine {
    /// 1-based line
    pub line: usize,
    /// The comment including its `#`
    pub text: String,
    /// Nothing but whitespace precedes the comment on its line
    pub full_line: bool,
}

/// Characters added around each alias by [`rewrite_aliases`]: a leading `!`
/// and a trailing ` ''`.
const ALIAS_GROWTH: usize = 4;

pub(crate) fn prescan(source: &str) -> Prescan {
    let mut out = Prescan::default();
    let mut quote: Option<char> = None;
    let mut block_indent: Option<usize> = None;
    let mut flow_depth = 0usize;
    // indentation a block plain scalar's continuation lines must exceed
    let mut continuation: Option<usize> = None;
    let mut line_offset = 0usize;

    for (line_no, raw_line) in source.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let chars: Vec<char> = line.chars().collect();
        let offset = line_offset;
        line_offset += raw_line.chars().count() + 1;

        let indent = chars.iter().take_while(|c| **c == ' ').count();
        let blank = chars.iter().all(|c| c.is_whitespace());

        if let Some(parent) = block_indent {
            if blank || indent > parent {
                continue;
            }
            block_indent = None;
        }

        if let Some(parent) = continuation {
            if blank {
                continue;
            }
            if indent > parent {
                // the line is scalar text up to a comment, which ends the scalar
                if let Some(start) = comment_start(&chars, indent) {
                    out.comments.push(comment_line(&chars, start, line_no));
                    continuation = None;
                }
                continue;
            }
            continuation = None;
        }

        let mut i = 0;
        if let Some(q) = quote {
            match find_closing_quote(&chars, 0, q) {
                Some(end) => {
                    quote = None;
                    i = end + 1;
                }
                None => continue,
            }
        }

        let mut plain = false;
        let mut plain_start = 0;
        while i < chars.len() {
            let c = chars[i];
            let after_space = i == 0 || chars[i - 1].is_whitespace();

            if c == '#' && after_space {
                out.comments.push(comment_line(&chars, i, line_no));
                plain = false;
                break;
            }
            if c.is_whitespace() {
                i += 1;
                continue;
            }

            if plain {
                if c == ':' && ends_token(&chars, i + 1) {
                    plain = false;
                    i += 1;
                    continue;
                }
                if !(flow_depth > 0 && matches!(c, ',' | ']' | '}')) {
                    i += 1;
                    continue;
                }
                plain = false;
            }

            match c {
                '"' | '\'' => match find_closing_quote(&chars, i + 1, c) {
                    Some(end) => i = end + 1,
                    None => {
                        quote = Some(c);
                        break;
                    }
                },
                '&' => {
                    let (name, end) = read_name(&chars, i + 1);
                    out.anchors.push(name);
                    i = end;
                }
                '*' => {
                    let (name, end) = read_name(&chars, i + 1);
                    if name.is_empty() {
                        plain = true;
                        plain_start = i;
                        i += 1;
                    } else {
                        out.aliases.push(AliasSite {
                            name,
                            offset: offset + i,
                            line: line_no,
                            col: i,
                        });
                        i = end;
                    }
                }
                '!' => {
                    while i < chars.len() && !chars[i].is_whitespace() {
                        i += 1;
                    }
                }
                '|' | '>' => {
                    let mut j = i + 1;
                    while j < chars.len() && (chars[j].is_ascii_digit() || matches!(chars[j], '+' | '-')) {
                        j += 1;
                    }
                    if ends_token(&chars, j) {
                        block_indent = Some(block_parent_indent(&chars, i));
                        // a comment may still follow the indicator
                        i = j;
                        continue;
                    }
                    plain = true;
                    plain_start = i;
                    i += 1;
                }
                '-' if i == indent && starts_with(&chars, i, "---") && ends_token(&chars, i + 3) => {
                    i += 3;
                }
                '.' if i == 0 && starts_with(&chars, i, "...") && ends_token(&chars, i + 3) => {
                    i += 3;
                }
                '%' if i == 0 => break,
                '-' | '?' | ':' if ends_token(&chars, i + 1) => i += 1,
                '[' | '{' => {
                    flow_depth += 1;
                    i += 1;
                }
                ']' | '}' => {
                    flow_depth = flow_depth.saturating_sub(1);
                    i += 1;
                }
                ',' => i += 1,
                _ => {
                    plain = true;
                    plain_start = i;
                    i += 1;
                }
            }
        }

        if plain && flow_depth == 0 && quote.is_none() && block_indent.is_none() {
            continuation = Some(block_parent_indent(&chars, plain_start));
        }
    }

    out
}

fn comment_line(chars: &[char], start: usize, line_no: usize) -> CommentLine {
    CommentLine {
        line: line_no + 1,
        text: chars[start..].iter().collect::<String>().trim_end().to_string(),
        full_line: chars[..start].iter().all(|c| c.is_whitespace()),
    }
}

/// Column of the first ` #` comment at or after `from`.
fn comment_start(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len()).find(|&i| chars[i] == '#' && (i == 0 || chars[i - 1].is_whitespace()))
}

/// Rewrite each alias `*name` into `!*name ''`, a tagged empty scalar the
/// event parser accepts whether or not `name` is a known anchor.
pub(crate) fn rewrite_aliases(source: &str, aliases: &[AliasSite]) -> String {
    if aliases.is_empty() {
        return source.to_string();
    }
    let mut out = String::with_capacity(source.len() + aliases.len() * ALIAS_GROWTH);
    let mut pending = aliases.iter().peekable();
    let mut skip_until = 0usize;
    for (index, ch) in source.chars().enumerate() {
        if let Some(site) = pending.peek()
            && site.offset == index
        {
            out.push('!');
            out.push('*');
            out.push_str(&site.name);
            out.push_str(" ''");
            skip_until = index + 1 + site.name.chars().count();
            pending.next();
            continue;
        }
        if index < skip_until {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Maps positions in the rewritten source back to the original text.
#[derive(Debug, Default)]
pub(crate) struct PositionMap {
    sites: Vec<AliasSite>,
}

/// A position in the original source (0-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl PositionMap {
    pub fn new(sites: Vec<AliasSite>) -> Self {
        Self { sites }
    }

    /// Translate a marker from the rewritten source. Positions that fall
    /// inside a rewritten alias map to the alias's `*`.
    pub fn locate(&self, marker: &Marker) -> Position {
        let offset = marker.index();
        let line = marker.line().saturating_sub(1);
        let col = marker.col();

        let mut shift = 0;
        let mut col_shift = 0;
        for (n, site) in self.sites.iter().enumerate() {
            let start = site.offset + n * ALIAS_GROWTH;
            let end = start + site.name.chars().count() + 1 + ALIAS_GROWTH;
            if offset < start {
                break;
            }
            if offset < end {
                return Position {
                    offset: site.offset,
                    line: site.line,
                    col: site.col,
                };
            }
            shift += ALIAS_GROWTH;
            if site.line == line {
                col_shift += ALIAS_GROWTH;
            }
        }
        Position {
            offset: offset - shift,
            line,
            col: col.saturating_sub(col_shift),
        }
    }
}

fn find_closing_quote(chars: &[char], mut i: usize, quote: char) -> Option<usize> {
    while i < chars.len() {
        let c = chars[i];
        if quote == '"' && c == '\\' {
            i += 2;
            continue;
        }
        if c == quote {
            if quote == '\'' && chars.get(i + 1) == Some(&'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

fn read_name(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len()
        && !chars[end].is_whitespace()
        && !matches!(chars[end], ',' | '[' | ']' | '{' | '}')
    {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn ends_token(chars: &[char], i: usize) -> bool {
    i >= chars.len() || chars[i].is_whitespace()
}

fn starts_with(chars: &[char], i: usize, pattern: &str) -> bool {
    pattern
        .chars()
        .enumerate()
        .all(|(k, p)| chars.get(i + k) == Some(&p))
}

/// Indentation a block scalar's content must exceed: the column of the key
/// owning the scalar, or of the innermost `-` when the scalar is a sequence
/// item.
fn block_parent_indent(chars: &[char], indicator: usize) -> usize {
    let mut k = chars.iter().take_while(|c| **c == ' ').count();
    let mut parent = k;
    while k < indicator && chars[k] == '-' && ends_token(chars, k + 1) {
        parent = k;
        k += 1;
        while k < chars.len() && chars[k] == ' ' {
            k += 1;
        }
    }
    if k == indicator { parent } else { k }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_anchors_in_order() {
        let scan = prescan("a: &first 1\nb: [&second x, 2]\n");
        assert_eq!(scan.anchors, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_collects_aliases() {
        let scan = prescan("- *a\n- [*b, *c]\n");
        let names: Vec<&str> = scan.aliases.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(scan.aliases[0].offset, 2);
        assert_eq!(scan.aliases[1].line, 1);
        assert_eq!(scan.aliases[1].col, 3);
    }

    #[test]
    fn test_ignores_markers_inside_values() {
        let scan = prescan(
            "a: \"*not\"\nb: 'don''t &x'\nc: 2 * 3\nd: it's *fine\ne: |\n  *raw\n  # not a comment\nf: x#y\n",
        );
        assert!(scan.aliases.is_empty());
        assert!(scan.anchors.is_empty());
        assert!(scan.comments.is_empty());
    }

    #[test]
    fn test_multiline_quoted_scalar() {
        let scan = prescan("a: \"first\n  *second\"\nb: *c\n");
        assert_eq!(scan.aliases.len(), 1);
        assert_eq!(scan.aliases[0].name, "c");
    }

    #[test]
    fn test_block_scalar_in_sequence_item() {
        let scan = prescan("- name: x\n  script: |\n    echo *y\n  other: *z\n");
        assert_eq!(scan.aliases.len(), 1);
        assert_eq!(scan.aliases[0].name, "z");
    }

    #[test]
    fn test_comments() {
        let scan = prescan("# head\na: 1 # trailing\n\n  # indented\nb: '#x'\n");
        assert_eq!(
            scan.comments,
            vec![
                CommentLine { line: 1, text: "# head".into(), full_line: true },
                CommentLine { line: 2, text: "# trailing".into(), full_line: false },
                CommentLine { line: 4, text: "# indented".into(), full_line: true },
            ]
        );
    }

    #[test]
    fn test_plain_scalar_continuation_lines() {
        let scan = prescan("a: hello\n  *world\n\n  &more # note\nb: &b 1\nc: *b\n");
        assert_eq!(scan.anchors, vec!["b".to_string()]);
        let names: Vec<&str> = scan.aliases.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
        assert_eq!(scan.comments.len(), 1);
        assert_eq!(scan.comments[0].line, 4);
        assert!(!scan.comments[0].full_line);
    }

    #[test]
    fn test_plain_scalar_in_sequence_item_ends_at_sibling() {
        let scan = prescan("- name: app\n  image: *img\n- plain\n- *next\n");
        let names: Vec<&str> = scan.aliases.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["img", "next"]);
    }

    #[test]
    fn test_star_operator_is_not_an_alias() {
        let scan = prescan("- [\"*\", 2, 3]\n- [*, 2]\n");
        assert!(scan.aliases.is_empty());
    }

    #[test]
    fn test_rewrite_aliases() {
        let source = "a: *x\nb: [*y, *zz]\n";
        let scan = prescan(source);
        let rewritten = rewrite_aliases(source, &scan.aliases);
        assert_eq!(rewritten, "a: !*x ''\nb: [!*y '', !*zz '']\n");
    }

    #[test]
    fn test_position_map() {
        let source = "a: *x\nb: [*y, *zz, 5]\n";
        let scan = prescan(source);
        let map = PositionMap::new(scan.aliases.clone());
        let rewritten = rewrite_aliases(source, &scan.aliases);

        // the `5` moved right by two rewrites on its line
        let five = rewritten.chars().position(|c| c == '5').unwrap();
        let original_five = source.chars().position(|c| c == '5').unwrap();
        let marker = Marker::new(five, 2, 21);
        let pos = map.locate(&marker);
        assert_eq!(pos.offset, original_five);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.col, 13);

        // a position inside a rewritten alias maps to its `*`
        let inside = Marker::new(7, 1, 7);
        let pos = map.locate(&inside);
        assert_eq!(pos.offset, 3);
        assert_eq!(pos.col, 3);
    }
}
