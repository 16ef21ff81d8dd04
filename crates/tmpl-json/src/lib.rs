/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Extract JSON from hybrid template/JSON sources.
//!
//! Template files are JSON (with comments and trailing commas) interleaved
//! with three directive families:
//!
//! - Variable interpolation: `{{ name }}`
//! - Control blocks: `{% if x %}` (recognized and skipped, never executed)
//! - Imports: `// [Description](file://path/to/part.tmpl)`
//!
//! [`parse`] follows imports recursively, splices the imported values into
//! one merged document, substitutes placeholder values for variables, and
//! records for every node of the result where in the authored templates it
//! came from. A validator that reports a problem at `/elements/0/text` can
//! turn that pointer back into a file, line and column with
//! [`ParseResult::locate`].
//!
//! # Architecture
//!
//! - [`scanner`]: text → tokens with exact spans
//! - `resolver`: import path resolution, cycle and depth checks
//! - `assembler`: tokens → JSON value plus source mappings
//! - [`cache`]: optional content-addressed result cache
//!
//! Nothing in a parse is fatal except failing to read or tokenize the root
//! file. Every other problem becomes a [`ParseError`] in
//! [`ParseResult::errors`] with a `null` or partial value in its place.
//!
//! # Example
//!
//! ```ignore
//! use tmpl_json::{ParseOptions, parse};
//!
//! let options = ParseOptions::new().with_base_path("site");
//! let result = parse("pages/home.tmpl", &options);
//! for error in &result.errors {
//!     eprintln!("{}", error);
//! }
//! if let Some(origin) = result.locate("/elements/0/text") {
//!     println!("defined at {}", origin);
//! }
//! ```

pub(crate) mod assembler;
pub mod cache;
pub mod defaults;
pub mod error;
pub mod loader;
pub mod options;
pub(crate) mod resolver;
pub mod result;
pub mod scanner;
pub mod token;

pub use cache::ParseCache;
pub use error::{ErrorDetail, LoadError, ParseError, ParseErrorKind};
pub use loader::{FileSystemLoader, MemoryLoader, SourceLoader};
pub use options::{CancellationToken, ParseOptions};
pub use result::{FileSpan, ImportRecord, ParseResult, ParseStats};
pub use token::{ImportDirective, SourceSpan, Token, TokenData, TokenKind};
pub use tmpl_json_source_map::{JsonPointer, SourceMap, SourceMapping};

use resolver::ImportResolver;
use std::path::Path;

/// Parse the template at `root` (relative to `options.base_path`) from the
/// filesystem.
pub fn parse(root: impl AsRef<Path>, options: &ParseOptions) -> ParseResult {
    parse_with_loader(root, options, &FileSystemLoader)
}

/// Parse with an explicit source loader.
///
/// ```
/// use serde_json::json;
/// use tmpl_json::{MemoryLoader, ParseOptions, parse_with_loader};
///
/// let loader = MemoryLoader::with_files([
///     ("/site/root.tmpl", "// [Header](file://./header.tmpl)\n{\"type\": \"Stack\", \"elements\": [{{ header }}]}"),
///     ("/site/header.tmpl", "{\"type\": \"Text\", \"text\": \"Hi\"}"),
/// ]);
/// let options = ParseOptions::new().with_base_path("/site");
/// let result = parse_with_loader("root.tmpl", &options, &loader);
///
/// assert!(result.is_ok());
/// assert_eq!(
///     result.extracted_value,
///     json!({"type": "Stack", "elements": [{"type": "Text", "text": "Hi"}]})
/// );
/// assert_eq!(result.locate("/elements/0/text").unwrap().source_file, "/site/header.tmpl");
/// ```
pub fn parse_with_loader(
    root: impl AsRef<Path>,
    options: &ParseOptions,
    loader: &dyn SourceLoader,
) -> ParseResult {
    ImportResolver::new(options, loader).parse_root(root.as_ref(), None)
}

/// Parse `content` as if it were the file at `root`. Imports are read from
/// the filesystem relative to that path.
pub fn parse_str(root: impl AsRef<Path>, content: &str, options: &ParseOptions) -> ParseResult {
    ImportResolver::new(options, &FileSystemLoader).parse_root(root.as_ref(), Some(content.to_string()))
}
