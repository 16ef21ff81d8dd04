/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template extraction.
//!
//! Every problem found while extracting a document is a [`ParseError`]
//! value collected into the result. Nothing here is meant to be propagated
//! with `?` out of [`parse`](crate::parse); the only `Result` seam is the
//! [`SourceLoader`](crate::SourceLoader) boundary, which speaks [`LoadError`].

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tmpl_json_source_map::Location;

/// The error categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    /// An import cycle, or an import chain deeper than the configured limit.
    CircularImport,
    /// The root file or an imported file could not be found or read.
    FileNotFound,
    /// A literal JSON fragment is malformed.
    ParseError,
    /// A directive is not closed before the end of the file.
    InvalidSyntax,
    /// The parse was cancelled before an import could be read.
    Cancelled,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::CircularImport => "circular_import",
            ParseErrorKind::FileNotFound => "file_not_found",
            ParseErrorKind::ParseError => "parse_error",
            ParseErrorKind::InvalidSyntax => "invalid_syntax",
            ParseErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra structure attached to some errors.
///
/// Import cycles and over-deep import chains share the `circular_import`
/// kind; the detail tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ErrorDetail {
    /// The canonical paths of the cycle, ending with the repeated file.
    #[serde(rename_all = "camelCase")]
    ImportCycle { chain: Vec<String> },
    /// The chain was `depth` imports deep when the limit was hit.
    #[serde(rename_all = "camelCase")]
    DepthExceeded { depth: usize, max_depth: usize },
}

/// A located problem found while extracting a document.
///
/// `line` and `column` are 1-based; both are 0 when the error has no
/// position (for example a root file that does not exist).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message} ({file}:{line}:{column})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetail>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        file: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            file: file.into(),
            line,
            column,
            detail: None,
        }
    }

    /// An error positioned at a 0-indexed [`Location`].
    pub fn at(
        kind: ParseErrorKind,
        message: impl Into<String>,
        file: impl Into<String>,
        location: &Location,
    ) -> Self {
        ParseError::new(
            kind,
            message,
            file,
            location.line_number(),
            location.column_number(),
        )
    }

    /// An error with no position inside the file.
    pub fn unpositioned(
        kind: ParseErrorKind,
        message: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        ParseError::new(kind, message, file, 0, 0)
    }

    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// True for a real import cycle.
    pub fn is_import_cycle(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::ImportCycle { .. }))
    }

    /// True when the import depth limit was hit (reported as `circular_import`).
    pub fn is_depth_exceeded(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::DepthExceeded { .. }))
    }
}

/// Errors raised by a [`SourceLoader`](crate::SourceLoader).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;
