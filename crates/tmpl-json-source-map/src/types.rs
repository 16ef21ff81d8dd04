//! Core types for source positions

use serde::{Deserialize, Serialize};

/// A unique identifier for a source file within one [`SourceContext`](crate::SourceContext)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub usize);

/// A location in source text (0-indexed)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Location {
    /// Byte offset from start of source
    pub offset: usize,
    /// Row number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in characters not bytes)
    pub column: usize,
}

impl Location {
    pub fn new(offset: usize, row: usize, column: usize) -> Self {
        Location {
            offset,
            row,
            column,
        }
    }

    /// 1-based line number, as shown to users.
    pub fn line_number(&self) -> usize {
        self.row + 1
    }

    /// 1-based column number, as shown to users.
    pub fn column_number(&self) -> usize {
        self.column + 1
    }
}

/// A range in source text from start to end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Start location (inclusive)
    pub start: Location,
    /// End location (exclusive)
    pub end: Location,
}

impl Range {
    pub fn new(start: Location, end: Location) -> Self {
        Range { start, end }
    }

    /// A zero-width range at `at`.
    pub fn empty(at: Location) -> Self {
        Range { start: at, end: at }
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_equality() {
        assert_eq!(FileId(0), FileId(0));
        assert_ne!(FileId(0), FileId(1));
    }

    #[test]
    fn test_location_ordering() {
        let loc1 = Location::new(0, 0, 0);
        let loc2 = Location::new(5, 0, 5);
        let loc3 = Location::new(10, 1, 0);

        assert!(loc1 < loc2);
        assert!(loc2 < loc3);
        assert!(loc1 < loc3);
    }

    #[test]
    fn test_one_based_accessors() {
        let loc = Location::new(12, 2, 4);
        assert_eq!(loc.line_number(), 3);
        assert_eq!(loc.column_number(), 5);
    }

    #[test]
    fn test_range_len() {
        let range = Range::new(Location::new(3, 0, 3), Location::new(10, 1, 2));
        assert_eq!(range.len(), 7);
        assert!(!range.is_empty());
        assert!(Range::empty(Location::new(4, 0, 4)).is_empty());
    }

    #[test]
    fn test_serialization_location() {
        let loc = Location::new(100, 5, 10);
        let json = serde_json::to_string(&loc).unwrap();
        let deserialized: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(loc, deserialized);
    }
}
