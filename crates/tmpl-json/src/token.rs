/*
 * token.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokens produced by the scanner.

use serde::Serialize;
use std::path::Path;
use tmpl_json_source_map::{FileId, Range};

pub use tmpl_json_source_map::TokenKind;

/// Exact position of a token inside one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub file: FileId,
    pub range: Range,
}

impl SourceSpan {
    pub fn new(file: FileId, range: Range) -> Self {
        SourceSpan { file, range }
    }

    pub fn start_offset(&self) -> usize {
        self.range.start.offset
    }

    pub fn end_offset(&self) -> usize {
        self.range.end.offset
    }

    /// 1-based start line.
    pub fn start_line(&self) -> usize {
        self.range.start.line_number()
    }

    /// 1-based start column.
    pub fn start_col(&self) -> usize {
        self.range.start.column_number()
    }

    pub fn end_line(&self) -> usize {
        self.range.end.line_number()
    }

    pub fn end_col(&self) -> usize {
        self.range.end.column_number()
    }
}

/// The pieces of an `// [description](path)` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    /// Free text between the brackets.
    pub description: String,
    /// The path exactly as written, scheme included.
    pub path: String,
}

impl ImportDirective {
    /// The name `{{ … }}` expressions use to refer to this import: the file
    /// stem of its path (`header` for `file://./header.tmpl`).
    pub fn binding_name(&self) -> Option<&str> {
        let path = self.path.strip_prefix("file://").unwrap_or(&self.path);
        Path::new(path).file_stem().and_then(|s| s.to_str())
    }
}

/// What a token carries besides its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenData {
    Literal,
    /// Trimmed text between `{{` and `}}`.
    Variable { expr: String },
    Import(ImportDirective),
    /// Trimmed text between `{%` and `%}`.
    Control { expr: String },
}

/// One span of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub data: TokenData,
    /// The exact source text covered by the token, delimiters included.
    pub raw: String,
    pub span: SourceSpan,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self.data {
            TokenData::Literal => TokenKind::Literal,
            TokenData::Variable { .. } => TokenKind::Variable,
            TokenData::Import(_) => TokenKind::ImportDirective,
            TokenData::Control { .. } => TokenKind::ControlBlock,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.data, TokenData::Literal)
    }
}
