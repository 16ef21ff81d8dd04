//! Source context for managing files

use crate::file_info::FileInformation;
use crate::types::{FileId, Location};
use serde::{Deserialize, Serialize};

/// Registry of the files read while assembling one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContext {
    files: Vec<SourceFile>,
}

/// A source file with content and its line index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path or identifier
    pub path: String,
    /// File content
    pub content: String,
    /// Line index for location lookups
    pub file_info: FileInformation,
}

impl SourceContext {
    /// Create a new empty source context
    pub fn new() -> Self {
        SourceContext { files: Vec::new() }
    }

    /// Add a file to the context and return its ID
    ///
    /// Adding the same path twice registers two files.
    pub fn add_file(&mut self, path: String, content: String) -> FileId {
        let id = FileId(self.files.len());
        let file_info = FileInformation::new(&content);
        self.files.push(SourceFile {
            path,
            content,
            file_info,
        });
        id
    }

    /// Get a file by ID
    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Path of a registered file
    pub fn path(&self, id: FileId) -> Option<&str> {
        self.get_file(id).map(|f| f.path.as_str())
    }

    /// Map a byte offset in a registered file to a full location
    pub fn location(&self, id: FileId, offset: usize) -> Option<Location> {
        let file = self.get_file(id)?;
        file.file_info.offset_to_location(offset, &file.content)
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let ctx = SourceContext::new();
        assert!(ctx.get_file(FileId(0)).is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_add_and_get_file() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("test.tmpl".to_string(), "{\"a\": 1}".to_string());

        assert_eq!(id, FileId(0));
        let file = ctx.get_file(id).unwrap();
        assert_eq!(file.path, "test.tmpl");
        assert_eq!(file.file_info.total_length(), 8);
    }

    #[test]
    fn test_multiple_files() {
        let mut ctx = SourceContext::new();
        let id1 = ctx.add_file("first.tmpl".to_string(), "1".to_string());
        let id2 = ctx.add_file("second.tmpl".to_string(), "[\n2]".to_string());

        assert_eq!(id1, FileId(0));
        assert_eq!(id2, FileId(1));
        assert_eq!(ctx.path(id2), Some("second.tmpl"));
        assert_eq!(ctx.path(FileId(2)), None);
        assert_eq!(ctx.path(id1), Some("first.tmpl"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_location_lookup() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("a.tmpl".to_string(), "{\n  \"x\": true\n}".to_string());

        let loc = ctx.location(id, 4).unwrap();
        assert_eq!(loc.row, 1);
        assert_eq!(loc.column, 2);
        assert!(ctx.location(id, 1000).is_none());
        assert!(ctx.location(FileId(7), 0).is_none());
    }

    #[test]
    fn test_serialization() {
        let mut ctx = SourceContext::new();
        ctx.add_file("test.tmpl".to_string(), "null".to_string());

        let json = serde_json::to_string(&ctx).unwrap();
        let deserialized: SourceContext = serde_json::from_str(&json).unwrap();

        let file = deserialized.get_file(FileId(0)).unwrap();
        assert_eq!(file.path, "test.tmpl");
        assert_eq!(file.file_info.total_length(), 4);
    }
}
