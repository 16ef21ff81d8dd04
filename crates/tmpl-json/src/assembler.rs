/*
 * assembler.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Assembling one file's token stream into a JSON value.
//!
//! A recursive-descent JSON parser whose input is the literal tokens of a
//! file, read as one continuous character stream, and whose atoms also
//! include directive tokens:
//!
//! - `{{ expr }}` in value position becomes the value of a same-file import
//!   binding or a default value; inside a string it is rendered as text; in
//!   member position an object value is spread into the enclosing object.
//! - `// [desc](path)` in value or member position inside a container is
//!   resolved and spliced (or spread). At top level it is a declaration:
//!   resolved, recorded and available to `{{ name }}`.
//! - `{% … %}` is skipped.
//!
//! Comments (`//` and `/* */`) and trailing commas are accepted. The first
//! syntax error stops the file; whatever was built so far is kept.
//!
//! Source mappings are recorded post-order: an object member maps to its
//! key, an array element or the root to where its value starts. Mappings of
//! a spliced import are re-rooted under the splice pointer before the
//! splice point's own mapping is written.

use crate::defaults::{default_value, variable_name};
use crate::error::{ParseError, ParseErrorKind};
use crate::resolver::{ActiveStack, Assembled, ImportResolver, STACK_RED_ZONE, STACK_SEGMENT};
use crate::token::{Token, TokenData, TokenKind};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tmpl_json_source_map::{FileId, JsonPointer, Location, SourceMap, SourceMapping};

/// What the cursor is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Char(char),
    /// Index of a variable or import token.
    Directive(usize),
    End,
}

pub(crate) struct Assembler<'r, 'a> {
    resolver: &'r mut ImportResolver<'a>,
    stack: &'r mut ActiveStack,
    file: FileId,
    path: String,
    tokens: &'r [Token],
    /// Current token.
    tok: usize,
    /// Byte position inside the current literal token.
    pos: usize,
    failed: bool,
    /// Import binding name → token index, first directive wins.
    bindings: HashMap<String, usize>,
    /// Imports already resolved in this file, by token index.
    resolved: HashMap<usize, Assembled>,
    map: SourceMap,
}

impl<'r, 'a> Assembler<'r, 'a> {
    pub fn new(
        resolver: &'r mut ImportResolver<'a>,
        stack: &'r mut ActiveStack,
        file: FileId,
        tokens: &'r [Token],
    ) -> Self {
        let mut bindings = HashMap::new();
        for (index, token) in tokens.iter().enumerate() {
            if let TokenData::Import(directive) = &token.data
                && let Some(name) = directive.binding_name()
            {
                bindings.entry(name.to_string()).or_insert(index);
            }
        }
        let path = resolver.context.path(file).unwrap_or_default().to_string();

        Assembler {
            resolver,
            stack,
            file,
            path,
            tokens,
            tok: 0,
            pos: 0,
            failed: false,
            bindings,
            resolved: HashMap::new(),
            map: SourceMap::new(),
        }
    }

    pub fn run(mut self) -> Assembled {
        let root = JsonPointer::root();

        self.skip_declarations();
        let value = if self.failed || self.current() == Cursor::End {
            Value::Null
        } else {
            let (value, start, kind) = self.parse_value(&root);
            self.record(root, &start, kind);
            value
        };

        if !self.failed {
            self.skip_declarations();
            if !self.failed && self.current() != Cursor::End {
                self.fail("unexpected content after the top-level value");
            }
        }

        // Directives the parse never reached are still resolved and recorded.
        let tokens = self.tokens;
        for (index, token) in tokens.iter().enumerate() {
            if matches!(token.data, TokenData::Import(_)) {
                self.resolve_import(index);
            }
        }

        Assembled {
            value,
            source_map: self.map,
        }
    }

    // Cursor

    /// Move past exhausted literals and control blocks.
    fn settle(&mut self) {
        let tokens = self.tokens;
        while let Some(token) = tokens.get(self.tok) {
            match token.data {
                TokenData::Literal if self.pos < token.raw.len() => break,
                TokenData::Literal | TokenData::Control { .. } => self.advance_token(),
                _ => break,
            }
        }
    }

    fn current(&mut self) -> Cursor {
        self.settle();
        match self.tokens.get(self.tok) {
            None => Cursor::End,
            Some(token) if token.is_literal() => token.raw[self.pos..]
                .chars()
                .next()
                .map_or(Cursor::End, Cursor::Char),
            Some(_) => Cursor::Directive(self.tok),
        }
    }

    /// Unread text of the current literal token.
    fn rest(&self) -> &'r str {
        let tokens: &'r [Token] = self.tokens;
        match tokens.get(self.tok) {
            Some(token) if token.is_literal() => &token.raw[self.pos..],
            _ => "",
        }
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn advance_token(&mut self) {
        self.tok += 1;
        self.pos = 0;
    }

    fn is_import(&self, index: usize) -> bool {
        matches!(self.tokens[index].data, TokenData::Import(_))
    }

    /// Location of the cursor; the end of the file once input is exhausted.
    fn here(&mut self) -> Location {
        self.settle();
        let offset = match self.tokens.get(self.tok) {
            Some(token) => token.span.start_offset() + self.pos,
            None => self.tokens.last().map_or(0, |t| t.span.end_offset()),
        };
        self.resolver
            .context
            .location(self.file, offset)
            .unwrap_or_default()
    }

    // Errors and mappings

    fn fail(&mut self, message: impl Into<String>) {
        let location = self.here();
        self.fail_at(location, message);
    }

    /// Record the file's one syntax error and stop parsing it.
    fn fail_at(&mut self, location: Location, message: impl Into<String>) {
        if !self.failed {
            self.failed = true;
            self.report_at(location, message);
        }
    }

    /// Record a parse_error without stopping.
    fn report_at(&mut self, location: Location, message: impl Into<String>) {
        let error = ParseError::at(ParseErrorKind::ParseError, message, self.path.clone(), &location);
        tracing::debug!(file = %self.path, line = error.line, "{}", error.message);
        self.resolver.error(error);
    }

    fn record(&mut self, pointer: JsonPointer, location: &Location, kind: TokenKind) {
        if self.resolver.options.build_source_map {
            self.map
                .insert(SourceMapping::new(pointer, self.path.clone(), location, kind));
        }
    }

    /// Re-root the mappings of the import at `import` under `pointer`.
    fn splice(&mut self, import: Option<usize>, pointer: &JsonPointer) {
        if !self.resolver.options.build_source_map {
            return;
        }
        if let Some(assembled) = import.and_then(|index| self.resolved.get(&index)) {
            self.map.extend_prefixed(pointer, &assembled.source_map);
        }
    }

    // Directives

    /// Resolve the import directive at `index` once per file.
    fn resolve_import(&mut self, index: usize) {
        if self.resolved.contains_key(&index) {
            return;
        }
        let tokens = self.tokens;
        let token = &tokens[index];
        if let TokenData::Import(directive) = &token.data {
            let resolved = self.resolver.resolve(token, directive, self.file, self.stack);
            self.resolved.insert(index, resolved);
        }
    }

    fn import_value(&mut self, index: usize) -> Value {
        self.resolve_import(index);
        self.resolved
            .get(&index)
            .map_or(Value::Null, |assembled| assembled.value.clone())
    }

    /// Value of a variable or import token, plus the token index of the
    /// import it came from, if any.
    fn directive_value(&mut self, index: usize) -> (Value, Option<usize>) {
        let tokens = self.tokens;
        match &tokens[index].data {
            TokenData::Variable { expr } => match self.bindings.get(variable_name(expr)).copied() {
                Some(import) => (self.import_value(import), Some(import)),
                None => (
                    default_value(expr, &self.resolver.options.default_values),
                    None,
                ),
            },
            TokenData::Import(_) => (self.import_value(index), Some(index)),
            _ => (Value::Null, None),
        }
    }

    /// Handle a directive met where an object member is expected.
    fn spread(
        &mut self,
        index: usize,
        pointer: &JsonPointer,
        members: &mut Map<String, Value>,
        start: Location,
    ) {
        let tokens = self.tokens;
        let token = &tokens[index];
        let kind = token.kind();
        let (value, import) = self.directive_value(index);

        match value {
            Value::Object(spread) => {
                // Imported members keep the mappings of the file they came from.
                self.splice(import, pointer);
                for (key, value) in spread {
                    if import.is_none() {
                        self.record(pointer.child_key(&key), &start, kind);
                    }
                    members.insert(key, value);
                }
            }
            // The import already reported why it has no value.
            Value::Null if import.is_some() => {}
            other => self.report_at(
                start,
                format!(
                    "cannot spread {} from '{}' into an object",
                    describe(&other),
                    token.raw.trim()
                ),
            ),
        }
    }

    /// Whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.current() {
                Cursor::Char(c) if c.is_whitespace() || c == '\u{feff}' => self.bump(c),
                Cursor::Char('/') => {
                    let rest = self.rest();
                    if rest.starts_with("//") {
                        self.pos += rest.find('\n').unwrap_or(rest.len());
                    } else if rest.starts_with("/*") {
                        self.skip_block_comment();
                        if self.failed {
                            return;
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.here();
        self.pos += 2;
        loop {
            self.settle();
            let tokens = self.tokens;
            match tokens.get(self.tok) {
                None => {
                    self.fail_at(start, "unterminated block comment");
                    return;
                }
                Some(token) if token.is_literal() => match token.raw[self.pos..].find("*/") {
                    Some(end) => {
                        self.pos += end + 2;
                        return;
                    }
                    None => self.pos = token.raw.len(),
                },
                Some(_) => self.advance_token(),
            }
        }
    }

    /// Trivia plus top-level import declarations.
    fn skip_declarations(&mut self) {
        loop {
            self.skip_trivia();
            if self.failed {
                return;
            }
            match self.current() {
                Cursor::Directive(index) if self.is_import(index) => {
                    self.advance_token();
                    self.resolve_import(index);
                }
                _ => return,
            }
        }
    }

    // JSON

    fn parse_value(&mut self, pointer: &JsonPointer) -> (Value, Location, TokenKind) {
        self.skip_trivia();
        let start = self.here();
        if self.failed {
            return (Value::Null, start, TokenKind::Literal);
        }

        let value = match self.current() {
            Cursor::Directive(index) => {
                self.advance_token();
                let (value, import) = self.directive_value(index);
                self.splice(import, pointer);
                return (value, start, self.tokens[index].kind());
            }
            Cursor::Char('{') => {
                stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.parse_object(pointer))
            }
            Cursor::Char('[') => {
                stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.parse_array(pointer))
            }
            Cursor::Char('"') => self.parse_string().map_or(Value::Null, Value::String),
            Cursor::Char(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Cursor::Char(c) if c.is_alphabetic() => self.parse_keyword(),
            Cursor::Char(c) => {
                self.fail(format!("unexpected character '{}'", c));
                Value::Null
            }
            Cursor::End => {
                self.fail("unexpected end of input, expected a value");
                Value::Null
            }
        };
        (value, start, TokenKind::Literal)
    }

    fn parse_object(&mut self, pointer: &JsonPointer) -> Value {
        self.bump('{');
        let mut members = Map::new();

        loop {
            self.skip_trivia();
            if self.failed {
                break;
            }

            match self.current() {
                Cursor::Char('}') => {
                    self.bump('}');
                    break;
                }
                Cursor::Char('"') => {
                    let key_start = self.here();
                    let Some(key) = self.parse_string() else {
                        break;
                    };
                    self.skip_trivia();
                    if !self.expect(':') {
                        break;
                    }
                    let child = pointer.child_key(&key);
                    let (value, _, _) = self.parse_value(&child);
                    if self.failed && value.is_null() {
                        break;
                    }
                    members.insert(key, value);
                    self.record(child, &key_start, TokenKind::Literal);
                    if self.failed {
                        break;
                    }
                }
                Cursor::Directive(index) => {
                    let start = self.here();
                    self.advance_token();
                    self.spread(index, pointer, &mut members, start);
                    if self.is_import(index) {
                        // An import line needs no separator after it.
                        self.skip_trivia();
                        if self.current() == Cursor::Char(',') {
                            self.bump(',');
                        }
                        continue;
                    }
                }
                Cursor::Char(c) => {
                    self.fail(format!("expected a string key or '}}', found '{}'", c));
                    break;
                }
                Cursor::End => {
                    self.fail("unexpected end of input, expected '}'");
                    break;
                }
            }

            self.skip_trivia();
            if self.failed {
                break;
            }
            match self.current() {
                Cursor::Char(',') => self.bump(','),
                Cursor::Char('}') => {
                    self.bump('}');
                    break;
                }
                Cursor::Directive(index) if self.is_import(index) => {}
                Cursor::End => {
                    self.fail("unexpected end of input, expected ',' or '}'");
                    break;
                }
                _ => {
                    self.fail("expected ',' or '}'");
                    break;
                }
            }
        }

        Value::Object(members)
    }

    fn parse_array(&mut self, pointer: &JsonPointer) -> Value {
        self.bump('[');
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            if self.failed {
                break;
            }
            match self.current() {
                Cursor::Char(']') => {
                    self.bump(']');
                    break;
                }
                Cursor::End => {
                    self.fail("unexpected end of input, expected ']'");
                    break;
                }
                _ => {}
            }

            let child = pointer.child_index(items.len());
            let (value, start, kind) = self.parse_value(&child);
            if self.failed && value.is_null() {
                break;
            }
            items.push(value);
            self.record(child, &start, kind);
            if self.failed {
                break;
            }

            self.skip_trivia();
            if self.failed {
                break;
            }
            match self.current() {
                Cursor::Char(',') => self.bump(','),
                Cursor::Char(']') => {
                    self.bump(']');
                    break;
                }
                // Consecutive import lines are consecutive elements.
                Cursor::Directive(index) if self.is_import(index) => {}
                Cursor::End => {
                    self.fail("unexpected end of input, expected ',' or ']'");
                    break;
                }
                _ => {
                    self.fail("expected ',' or ']'");
                    break;
                }
            }
        }

        Value::Array(items)
    }

    fn expect(&mut self, expected: char) -> bool {
        match self.current() {
            Cursor::Char(c) if c == expected => {
                self.bump(c);
                true
            }
            Cursor::End => {
                self.fail(format!("unexpected end of input, expected '{}'", expected));
                false
            }
            _ => {
                self.fail(format!("expected '{}'", expected));
                false
            }
        }
    }

    /// Parse a string starting at its opening quote. Variables inside the
    /// string are rendered into it; control blocks are dropped.
    fn parse_string(&mut self) -> Option<String> {
        let start = self.here();
        self.bump('"');
        let mut out = String::new();

        loop {
            match self.current() {
                Cursor::Char('"') => {
                    self.bump('"');
                    return Some(out);
                }
                Cursor::Char('\\') => {
                    self.bump('\\');
                    self.parse_escape(&mut out)?;
                }
                Cursor::Char('\n') | Cursor::End => {
                    self.fail_at(start, "unterminated string");
                    return None;
                }
                Cursor::Char(c) if (c as u32) < 0x20 => {
                    self.fail(format!("control character U+{:04X} in string", c as u32));
                    return None;
                }
                Cursor::Char(c) => {
                    out.push(c);
                    self.bump(c);
                }
                Cursor::Directive(index) => {
                    let tokens = self.tokens;
                    self.advance_token();
                    match &tokens[index].data {
                        TokenData::Variable { .. } => {
                            let (value, _) = self.directive_value(index);
                            render_into(&value, &mut out);
                        }
                        _ => {
                            self.fail_at(start, "unterminated string");
                            return None;
                        }
                    }
                }
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Option<()> {
        let start = self.here();
        let Cursor::Char(c) = self.current() else {
            self.fail_at(start, "unterminated escape sequence");
            return None;
        };
        self.bump(c);

        let decoded = match c {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => {
                let first = self.hex4()?;
                let decoded = if (0xD800..0xDC00).contains(&first) {
                    if self.rest().starts_with("\\u") {
                        self.pos += 2;
                        let second = self.hex4()?;
                        if (0xDC00..0xE000).contains(&second) {
                            char::from_u32(0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00))
                        } else {
                            None
                        }
                    } else {
                        None
                    }
                } else {
                    char::from_u32(first)
                };
                match decoded {
                    Some(ch) => ch,
                    None => {
                        self.fail_at(start, "invalid unicode escape");
                        return None;
                    }
                }
            }
            other => {
                self.fail_at(start, format!("invalid escape '\\{}'", other));
                return None;
            }
        };
        out.push(decoded);
        Some(())
    }

    fn hex4(&mut self) -> Option<u32> {
        let digits = self
            .rest()
            .get(..4)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .and_then(|d| u32::from_str_radix(d, 16).ok());
        match digits {
            Some(n) => {
                self.pos += 4;
                Some(n)
            }
            None => {
                self.fail("invalid unicode escape");
                None
            }
        }
    }

    fn parse_number(&mut self) -> Value {
        let start = self.here();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
            .unwrap_or(rest.len());
        let text = &rest[..len];

        match serde_json::from_str::<Number>(text) {
            Ok(number) => {
                self.pos += len;
                Value::Number(number)
            }
            Err(_) => {
                self.fail_at(start, format!("invalid number '{}'", text));
                Value::Null
            }
        }
    }

    fn parse_keyword(&mut self) -> Value {
        let start = self.here();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let word = &rest[..len];

        let value = match word {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            _ => {
                self.fail_at(start, format!("unexpected '{}'", word));
                return Value::Null;
            }
        };
        self.pos += len;
        value
    }
}

/// Text of a value interpolated into a string.
fn render_into(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
