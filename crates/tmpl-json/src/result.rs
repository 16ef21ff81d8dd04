/*
 * result.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The output of a parse.

use crate::error::{ParseError, ParseErrorKind};
use crate::token::SourceSpan;
use serde::Serialize;
use serde_json::Value;
use tmpl_json_source_map::{JsonPointer, SourceMap, SourceMapping};

/// A span rendered for output: path plus 1-based start and end positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpan {
    pub file: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl FileSpan {
    pub fn new(file: impl Into<String>, span: &SourceSpan) -> Self {
        FileSpan {
            file: file.into(),
            start_line: span.start_line(),
            start_column: span.start_col(),
            end_line: span.end_line(),
            end_column: span.end_col(),
        }
    }
}

/// One import directive encountered during the parse, in the order the
/// directives were first resolved (a parent before its own imports).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// The path as written in the directive.
    pub original_path: String,
    /// Canonical target path, or the computed path when the target does
    /// not exist.
    pub resolved_path: String,
    pub directive_span: FileSpan,
    pub description: String,
    /// Assembled value of the target; `null` when it could not be loaded.
    pub parsed_value: Value,
    /// The target was already being assembled when this directive was met.
    pub is_recursive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStats {
    pub parse_time_ms: f64,
    pub import_count: usize,
    pub variable_count: usize,
    pub control_count: usize,
    pub total_size_bytes: usize,
}

/// A file read during the parse, with the SHA-256 of the content that was
/// read (`None` when it could not be read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub path: String,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub extracted_value: Value,
    pub imports: Vec<ImportRecord>,
    pub source_map: SourceMap,
    pub errors: Vec<ParseError>,
    pub stats: ParseStats,
    #[serde(skip)]
    pub dependencies: Vec<Dependency>,
}

impl ParseResult {
    /// Result for a root file that could not be read or tokenized.
    pub(crate) fn failed(error: ParseError) -> Self {
        ParseResult {
            extracted_value: Value::Null,
            errors: vec![error],
            ..Default::default()
        }
    }

    /// True when no errors were collected.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_of_kind(&self, kind: ParseErrorKind) -> impl Iterator<Item = &ParseError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// Translate a pointer reported against [`extracted_value`] into the
    /// template position that produced it, falling back to the nearest
    /// mapped ancestor. Returns `None` for malformed pointers.
    ///
    /// [`extracted_value`]: ParseResult::extracted_value
    pub fn locate(&self, pointer: &str) -> Option<&SourceMapping> {
        let pointer = JsonPointer::parse(pointer).ok()?;
        self.source_map.lookup(&pointer)
    }
}
