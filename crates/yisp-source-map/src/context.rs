//! Source context for managing files

use crate::source_info::SourceInfo;
use serde::{Deserialize, Serialize};

/// A unique identifier for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub usize);

/// Context for managing source files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContext {
    files: Vec<SourceFile>,
}

/// A source file with content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path or identifier
    pub path: String,
    /// File content
    pub content: String,
}

impl SourceContext {
    /// Create a new empty source context
    pub fn new() -> Self {
        SourceContext { files: Vec::new() }
    }

    /// Add a file to the context and return its ID
    ///
    /// Registering the same path again replaces the stored content and
    /// keeps the original ID.
    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<String>) -> FileId {
        let path = path.into();
        let content = content.into();
        if let Some(index) = self.files.iter().position(|f| f.path == path) {
            self.files[index].content = content;
            return FileId(index);
        }
        let id = FileId(self.files.len());
        self.files.push(SourceFile { path, content });
        id
    }

    /// Get a file by ID
    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Look up a file by the path it was registered under
    pub fn find_file(&self, path: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// The file a source location points into, if it was registered
    pub fn file_for(&self, info: &SourceInfo) -> Option<&SourceFile> {
        info.file.as_deref().and_then(|path| self.find_file(path))
    }

    /// The text covered by a source location
    pub fn snippet(&self, info: &SourceInfo) -> Option<String> {
        let file = self.file_for(info)?;
        let text: String = file.content.chars().skip(info.offset).take(info.len).collect();
        Some(text)
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
