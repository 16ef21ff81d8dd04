/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Recursive import resolution.
//!
//! One [`ImportResolver`] lives for one parse. It owns everything the parse
//! accumulates (registered files, import records, errors, statistics) and
//! re-enters the assembler for every imported file. The chain of files
//! currently being assembled is an [`ActiveStack`] of canonical paths,
//! pushed before assembling a file and popped after. Each level runs under
//! `stacker::maybe_grow`, so chain length is bounded by `max_import_depth`
//! rather than by the caller's thread stack.

use crate::assembler::Assembler;
use crate::cache::sha256_hex;
use crate::error::{ErrorDetail, ParseError, ParseErrorKind};
use crate::loader::{SourceLoader, normalize_path, resolve_import_path};
use crate::options::ParseOptions;
use crate::result::{Dependency, FileSpan, ImportRecord, ParseResult, ParseStats};
use crate::scanner::{ScanOutput, scan};
use crate::token::{ImportDirective, Token, TokenData};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tmpl_json_source_map::{FileId, SourceContext, SourceMap};

/// Stack that must remain before descending into an import or a nested
/// container; below it a fresh segment is allocated. Covers cloning an
/// imported value as deep as the import chain.
pub(crate) const STACK_RED_ZONE: usize = 1024 * 1024;
/// Size of each extra stack segment.
pub(crate) const STACK_SEGMENT: usize = 8 * 1024 * 1024;

/// Value and mappings of an assembled file (or of a resolved import).
#[derive(Debug, Clone, Default)]
pub(crate) struct Assembled {
    pub value: Value,
    pub source_map: SourceMap,
}

/// Canonical paths of the files currently being assembled, root first.
#[derive(Debug, Default)]
pub(crate) struct ActiveStack {
    paths: Vec<String>,
    members: HashSet<String>,
}

impl ActiveStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: String) {
        self.members.insert(path.clone());
        self.paths.push(path);
    }

    pub fn pop(&mut self) {
        if let Some(path) = self.paths.pop() {
            self.members.remove(&path);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.members.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// The cycle closed by importing `path` again: from its first
    /// occurrence to the top of the stack, then `path` itself.
    pub fn cycle_through(&self, path: &str) -> Vec<String> {
        let start = self.paths.iter().position(|p| p == path).unwrap_or(0);
        let mut chain = self.paths[start..].to_vec();
        chain.push(path.to_string());
        chain
    }
}

pub(crate) struct ImportResolver<'a> {
    pub(crate) options: &'a ParseOptions,
    loader: &'a dyn SourceLoader,
    pub(crate) context: SourceContext,
    imports: Vec<ImportRecord>,
    errors: Vec<ParseError>,
    stats: ParseStats,
    dependencies: Vec<Dependency>,
    cancelled: bool,
}

impl<'a> ImportResolver<'a> {
    pub fn new(options: &'a ParseOptions, loader: &'a dyn SourceLoader) -> Self {
        ImportResolver {
            options,
            loader,
            context: SourceContext::new(),
            imports: Vec::new(),
            errors: Vec::new(),
            stats: ParseStats::default(),
            dependencies: Vec::new(),
            cancelled: false,
        }
    }

    /// Run a whole parse rooted at `root`.
    ///
    /// `root` is resolved against the base path. When `content` is given it
    /// is used instead of reading the root file.
    pub fn parse_root(mut self, root: &Path, content: Option<String>) -> ParseResult {
        let started = Instant::now();
        let root_path = normalize_path(&self.options.base_path.join(root));
        tracing::debug!(root = %root_path.display(), "Parsing template");

        let canonical = match self.loader.canonicalize(&root_path) {
            Ok(canonical) => canonical,
            Err(_) if content.is_some() => root_path.clone(),
            Err(e) => {
                let path = root_path.display().to_string();
                self.record_dependency(&path, None);
                let error = ParseError::unpositioned(
                    ParseErrorKind::FileNotFound,
                    format!("cannot load root template: {}", e),
                    path,
                );
                return self.fatal(error, started);
            }
        };
        let path = canonical.display().to_string();

        let content = match content {
            Some(content) => content,
            None => match self.loader.read(&canonical) {
                Ok(content) => content,
                Err(e) => {
                    self.record_dependency(&path, None);
                    let error = ParseError::unpositioned(
                        ParseErrorKind::FileNotFound,
                        format!("cannot read root template: {}", e),
                        path,
                    );
                    return self.fatal(error, started);
                }
            },
        };
        self.record_dependency(&path, Some(&content));

        let (file, scanned) = self.register(path.clone(), content);
        if let Some(error) = scanned.error {
            let error = ParseError::at(
                ParseErrorKind::InvalidSyntax,
                error.message,
                path,
                &error.span.range.start,
            );
            return self.fatal(error, started);
        }

        let mut stack = ActiveStack::new();
        stack.push(path);
        let assembled = self.assemble_file(file, &scanned.tokens, &mut stack);
        stack.pop();

        let mut stats = self.stats;
        stats.import_count = self.imports.len();
        stats.parse_time_ms = elapsed_ms(started);
        tracing::debug!(
            imports = stats.import_count,
            errors = self.errors.len(),
            "Parse complete"
        );

        ParseResult {
            extracted_value: assembled.value,
            imports: self.imports,
            source_map: assembled.source_map,
            errors: self.errors,
            stats,
            dependencies: self.dependencies,
        }
    }

    fn fatal(self, error: ParseError, started: Instant) -> ParseResult {
        tracing::warn!(file = %error.file, "{}", error.message);
        let mut result = ParseResult::failed(error);
        result.stats = self.stats;
        result.stats.parse_time_ms = elapsed_ms(started);
        result.dependencies = self.dependencies;
        result
    }

    /// Register a file and tokenize it.
    fn register(&mut self, path: String, content: String) -> (FileId, ScanOutput) {
        self.stats.total_size_bytes += content.len();
        let scanned = scan(&content, FileId(self.context.len()));
        let file = self.context.add_file(path, content);
        (file, scanned)
    }

    fn record_dependency(&mut self, path: &str, content: Option<&str>) {
        self.dependencies.push(Dependency {
            path: path.to_string(),
            sha256: content.map(sha256_hex),
        });
    }

    pub fn error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Assemble one file whose canonical path is already on `stack`.
    pub fn assemble_file(
        &mut self,
        file: FileId,
        tokens: &[Token],
        stack: &mut ActiveStack,
    ) -> Assembled {
        for token in tokens {
            match token.data {
                TokenData::Variable { .. } => self.stats.variable_count += 1,
                TokenData::Control { .. } => self.stats.control_count += 1,
                _ => {}
            }
        }
        Assembler::new(self, stack, file, tokens).run()
    }

    /// Resolve the import directive `token`, found in `referrer`.
    ///
    /// Always produces a value: `null` stands in for anything that could
    /// not be loaded, and the reason is recorded as an error.
    pub fn resolve(
        &mut self,
        token: &Token,
        directive: &ImportDirective,
        referrer: FileId,
        stack: &mut ActiveStack,
    ) -> Assembled {
        let referrer_path = self.context.path(referrer).unwrap_or_default().to_string();
        let location = token.span.range.start;
        let target = resolve_import_path(
            &directive.path,
            Path::new(&referrer_path),
            &self.options.base_path,
            &self.options.template_extension,
        );

        let index = self.imports.len();
        self.imports.push(ImportRecord {
            original_path: directive.path.clone(),
            resolved_path: target.display().to_string(),
            directive_span: FileSpan::new(referrer_path.clone(), &token.span),
            description: directive.description.clone(),
            parsed_value: Value::Null,
            is_recursive: false,
        });

        let canonical: PathBuf = match self.loader.canonicalize(&target) {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::warn!(import = %directive.path, file = %referrer_path, "Import target not found");
                self.record_dependency(&target.display().to_string(), None);
                self.error(ParseError::at(
                    ParseErrorKind::FileNotFound,
                    format!("cannot resolve import '{}': {}", directive.path, e),
                    referrer_path,
                    &location,
                ));
                return Assembled::default();
            }
        };
        let path = canonical.display().to_string();
        self.imports[index].resolved_path = path.clone();

        if stack.contains(&path) {
            self.imports[index].is_recursive = true;
            if !self.options.allow_recursive_imports {
                let chain = stack.cycle_through(&path);
                tracing::warn!(import = %path, "Circular import");
                self.error(
                    ParseError::at(
                        ParseErrorKind::CircularImport,
                        format!("circular import: {}", chain.join(" -> ")),
                        referrer_path,
                        &location,
                    )
                    .with_detail(ErrorDetail::ImportCycle { chain }),
                );
            }
            return Assembled::default();
        }

        let max_depth = self.options.max_import_depth;
        if stack.len() > max_depth {
            tracing::warn!(import = %path, depth = stack.len(), "Import depth limit reached");
            self.error(
                ParseError::at(
                    ParseErrorKind::CircularImport,
                    format!(
                        "max import depth exceeded: importing '{}' would nest {} levels deep (limit {})",
                        directive.path,
                        stack.len(),
                        max_depth
                    ),
                    referrer_path,
                    &location,
                )
                .with_detail(ErrorDetail::DepthExceeded {
                    depth: stack.len(),
                    max_depth,
                }),
            );
            return Assembled::default();
        }

        if self.cancelled || self.options.is_cancelled() {
            if !self.cancelled {
                self.cancelled = true;
                tracing::debug!(import = %path, "Parse cancelled");
                self.error(ParseError::at(
                    ParseErrorKind::Cancelled,
                    format!("parse cancelled before reading '{}'", directive.path),
                    referrer_path,
                    &location,
                ));
            }
            return Assembled::default();
        }

        let content = match self.loader.read(&canonical) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(import = %path, "Cannot read import: {}", e);
                self.record_dependency(&path, None);
                self.error(ParseError::at(
                    ParseErrorKind::FileNotFound,
                    format!("cannot read import '{}': {}", directive.path, e),
                    referrer_path,
                    &location,
                ));
                return Assembled::default();
            }
        };
        tracing::debug!(import = %path, depth = stack.len(), "Resolving import");
        self.record_dependency(&path, Some(&content));

        let (file, scanned) = self.register(path.clone(), content);
        if let Some(error) = scanned.error {
            self.error(ParseError::at(
                ParseErrorKind::InvalidSyntax,
                error.message,
                path,
                &error.span.range.start,
            ));
            return Assembled::default();
        }

        stack.push(path);
        let assembled = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.assemble_file(file, &scanned.tokens, stack)
        });
        stack.pop();

        self.imports[index].parsed_value = assembled.value.clone();
        assembled
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
