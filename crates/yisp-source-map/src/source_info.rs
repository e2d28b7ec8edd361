//! Source location information for nodes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Source location of a node.
///
/// Offsets and lengths are counted in characters, matching both the
/// positions reported by the YAML scanner and the spans ariadne expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Optional filename or source identifier
    pub file: Option<Arc<str>>,

    /// Character offset from start of source (0-based)
    pub offset: usize,

    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based, in characters)
    pub col: usize,

    /// Length in characters
    pub len: usize,
}

impl SourceInfo {
    /// Create a new SourceInfo with all fields specified.
    pub fn new(file: Option<Arc<str>>, offset: usize, line: usize, col: usize, len: usize) -> Self {
        Self {
            file,
            offset,
            line,
            col,
            len,
        }
    }

    /// Set the filename for this source location.
    pub fn with_file(mut self, file: impl Into<Arc<str>>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Get the end offset (exclusive) of this location.
    pub fn end_offset(&self) -> usize {
        self.offset + self.len
    }

    /// The file name, or `<unknown>` for locations without one.
    pub fn file_name(&self) -> &str {
        self.file.as_deref().unwrap_or("<unknown>")
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            file: None,
            offset: 0,
            line: 1,
            col: 1,
            len: 0,
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_name(), self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_info_creation() {
        let info = SourceInfo::new(Some("test.yaml".into()), 10, 2, 5, 8);
        assert_eq!(info.file.as_deref(), Some("test.yaml"));
        assert_eq!(info.offset, 10);
        assert_eq!(info.line, 2);
        assert_eq!(info.col, 5);
        assert_eq!(info.len, 8);
        assert_eq!(info.end_offset(), 18);
    }

    #[test]
    fn test_with_file() {
        let info = SourceInfo::default().with_file("test.yaml");
        assert_eq!(info.file_name(), "test.yaml");
    }

    #[test]
    fn test_default() {
        let info = SourceInfo::default();
        assert_eq!(info.file, None);
        assert_eq!(info.offset, 0);
        assert_eq!(info.line, 1);
        assert_eq!(info.col, 1);
        assert_eq!(info.len, 0);
    }

    #[test]
    fn test_display() {
        let info = SourceInfo::new(Some("deploy.yaml".into()), 0, 3, 7, 1);
        assert_eq!(info.to_string(), "deploy.yaml:3:7");
        assert_eq!(SourceInfo::default().to_string(), "<unknown>:1:1");
    }

    #[test]
    fn test_serialization() {
        let info = SourceInfo::new(Some("a.yaml".into()), 4, 1, 5, 2);
        let json = serde_json::to_string(&info).unwrap();
        let back: SourceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
