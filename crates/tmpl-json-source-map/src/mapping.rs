//! Pointer-keyed source maps
//!
//! A [`SourceMap`] answers "which template text produced the node at this
//! pointer?". Entries keep the file that textually produced the node; when a
//! subtree is moved under a new parent only the pointer changes.

use crate::pointer::JsonPointer;
use crate::types::Location;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The kind of template token that produced a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Literal,
    Variable,
    ImportDirective,
    ControlBlock,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Literal => "literal",
            TokenKind::Variable => "variable",
            TokenKind::ImportDirective => "importDirective",
            TokenKind::ControlBlock => "controlBlock",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one node of the merged document came from
///
/// `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapping {
    pub pointer: JsonPointer,
    pub source_file: String,
    pub line: usize,
    pub column: usize,
    pub token_kind: TokenKind,
}

impl SourceMapping {
    pub fn new(
        pointer: JsonPointer,
        source_file: impl Into<String>,
        location: &Location,
        token_kind: TokenKind,
    ) -> Self {
        SourceMapping {
            pointer,
            source_file: source_file.into(),
            line: location.line_number(),
            column: location.column_number(),
            token_kind,
        }
    }
}

impl fmt::Display for SourceMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source_file, self.line, self.column)
    }
}

/// Insertion-ordered table of [`SourceMapping`]s with unique pointers
///
/// Inserting a pointer that is already present replaces the earlier mapping
/// in place (last write wins). Serializes as a JSON array of mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    entries: IndexMap<JsonPointer, SourceMapping>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap {
            entries: IndexMap::new(),
        }
    }

    /// Record a mapping, replacing any earlier one for the same pointer
    pub fn insert(&mut self, mapping: SourceMapping) {
        self.entries.insert(mapping.pointer.clone(), mapping);
    }

    /// Exact lookup
    pub fn get(&self, pointer: &JsonPointer) -> Option<&SourceMapping> {
        self.entries.get(pointer)
    }

    /// Lookup falling back to the nearest mapped ancestor
    ///
    /// Validators sometimes report on nodes that have no mapping of their
    /// own (a missing property, for instance); the closest enclosing node is
    /// the best position to show in that case.
    pub fn lookup(&self, pointer: &JsonPointer) -> Option<&SourceMapping> {
        pointer.ancestors().find_map(|p| self.entries.get(&p))
    }

    /// Move every mapping of `other` under `prefix` and merge it into `self`
    ///
    /// `source_file` is untouched: a spliced node still names the file that
    /// produced it.
    pub fn extend_prefixed(&mut self, prefix: &JsonPointer, other: &SourceMap) {
        for mapping in other.entries.values() {
            let mut moved = mapping.clone();
            moved.pointer = prefix.join(&mapping.pointer);
            self.insert(moved);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceMapping> {
        self.entries.values()
    }
}

impl FromIterator<SourceMapping> for SourceMap {
    fn from_iter<T: IntoIterator<Item = SourceMapping>>(iter: T) -> Self {
        let mut map = SourceMap::new();
        for mapping in iter {
            map.insert(mapping);
        }
        map
    }
}

impl Serialize for SourceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for SourceMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mappings = Vec::<SourceMapping>::deserialize(deserializer)?;
        Ok(mappings.into_iter().collect())
    }
}
