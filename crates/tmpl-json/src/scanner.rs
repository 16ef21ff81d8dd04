/*
 * scanner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template scanner.
//!
//! Splits template text into an ordered, non-overlapping token stream:
//!
//! - `{{ expr }}`: variable interpolation
//! - `{% expr %}`: control block
//! - `// [description](path)`: import directive
//! - everything else: literal JSON text
//!
//! The scanner keeps a running row/column counter and follows JSON string
//! state, so that `//` inside a string is not mistaken for a comment while
//! `{{ … }}` inside a string is still an interpolation. Plain `//` comments
//! and `/* … */` blocks are left inside the literal text, directives in them
//! included; the assembler skips them.

use crate::token::{ImportDirective, SourceSpan, Token, TokenData};
use tmpl_json_source_map::{FileId, Location, Range};

/// An unterminated directive. Scanning stops at the opening delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
    pub span: SourceSpan,
}

/// Tokens for one file, truncated at the first error if there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutput {
    pub tokens: Vec<Token>,
    pub error: Option<ScanError>,
}

/// Tokenize one file. Never fails: problems are reported in
/// [`ScanOutput::error`].
pub fn scan(content: &str, file: FileId) -> ScanOutput {
    Scanner::new(content, file).run()
}

struct Scanner<'a> {
    src: &'a str,
    file: FileId,
    pos: usize,
    row: usize,
    column: usize,
    literal_start: Location,
    in_string: bool,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, file: FileId) -> Self {
        Scanner {
            src,
            file,
            pos: 0,
            row: 0,
            column: 0,
            literal_start: Location::default(),
            in_string: false,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> ScanOutput {
        while let Some(c) = self.peek() {
            let rest = self.rest();

            if !self.in_string && rest.starts_with("/*") {
                self.skip_block_comment();
                continue;
            }

            let directive = if rest.starts_with("{{") {
                Some(("{{", "}}"))
            } else if rest.starts_with("{%") {
                Some(("{%", "%}"))
            } else {
                None
            };
            if let Some((open, close)) = directive {
                if let Err(error) = self.directive(open, close) {
                    self.flush_literal();
                    return ScanOutput {
                        tokens: self.tokens,
                        error: Some(error),
                    };
                }
                continue;
            }

            if self.in_string {
                match c {
                    '\\' => {
                        self.bump();
                        if self.peek() != Some('\n') {
                            self.bump();
                        }
                        continue;
                    }
                    '"' | '\n' => self.in_string = false,
                    _ => {}
                }
                self.bump();
                continue;
            }

            if rest.starts_with("//") {
                match parse_import(rest) {
                    Some((directive, len)) => self.import(directive, len),
                    None => self.skip_comment(),
                }
                continue;
            }

            if c == '"' {
                self.in_string = true;
            }
            self.bump();
        }

        self.flush_literal();
        ScanOutput {
            tokens: self.tokens,
            error: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn location(&self) -> Location {
        Location::new(self.pos, self.row, self.column)
    }

    /// Advance one character, keeping the row/column counter current.
    ///
    /// `\r\n` ends one line: the `\r` advances the column, the `\n` starts
    /// the next row.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.row += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_bytes(&mut self, len: usize) {
        let end = self.pos + len;
        while self.pos < end {
            if self.bump().is_none() {
                break;
            }
        }
    }

    fn flush_literal(&mut self) {
        let start = self.literal_start;
        if start.offset < self.pos {
            let raw = self.src[start.offset..self.pos].to_string();
            self.push(TokenData::Literal, raw, start);
        }
    }

    fn push(&mut self, data: TokenData, raw: String, start: Location) {
        let span = SourceSpan::new(self.file, Range::new(start, self.location()));
        self.tokens.push(Token { data, raw, span });
        self.literal_start = self.location();
    }

    fn directive(&mut self, open: &str, close: &str) -> Result<(), ScanError> {
        let start = self.location();
        let body_start = self.pos + open.len();
        let Some(body_len) = self.src[body_start..].find(close) else {
            return Err(ScanError {
                message: format!("unclosed '{}': expected '{}' before end of file", open, close),
                span: SourceSpan::new(self.file, Range::empty(start)),
            });
        };

        self.flush_literal();
        let body = self.src[body_start..body_start + body_len].trim().to_string();
        let raw_len = open.len() + body_len + close.len();
        let raw = self.src[self.pos..self.pos + raw_len].to_string();
        self.bump_bytes(raw_len);

        let data = if open == "{{" {
            TokenData::Variable { expr: body }
        } else {
            TokenData::Control { expr: body }
        };
        self.push(data, raw, start);
        Ok(())
    }

    fn import(&mut self, directive: ImportDirective, len: usize) {
        self.flush_literal();
        let start = self.location();
        let raw = self.src[self.pos..self.pos + len].to_string();
        self.bump_bytes(len);
        self.push(TokenData::Import(directive), raw, start);
    }

    /// Leave an ordinary line comment in the literal text, up to the newline.
    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    /// Leave a block comment in the literal text, through its closing `*/`
    /// or to the end of the file when it has none.
    fn skip_block_comment(&mut self) {
        let len = self.rest()[2..]
            .find("*/")
            .map_or(self.rest().len(), |end| end + 4);
        self.bump_bytes(len);
    }
}

/// Recognize `// [description](path)` at the start of `text`.
///
/// Returns the directive and the number of bytes it covers; anything after
/// the closing `)` is not part of the directive.
fn parse_import(text: &str) -> Option<(ImportDirective, usize)> {
    let line = text.split('\n').next()?.trim_end_matches('\r');
    let body = line.strip_prefix("//")?.trim_start_matches([' ', '\t']);
    let prefix_len = line.len() - body.len();

    let inner = body.strip_prefix('[')?;
    let desc_end = inner.find(']')?;
    let description = &inner[..desc_end];

    let target = inner[desc_end + 1..].strip_prefix('(')?;
    let path_end = target.find(')')?;
    let path = target[..path_end].trim();
    if path.is_empty() {
        return None;
    }

    let len = prefix_len + 1 + desc_end + 1 + 1 + path_end + 1;
    Some((
        ImportDirective {
            description: description.trim().to_string(),
            path: path.to_string(),
        },
        len,
    ))
}
