//! Source mapping for tmpl-json
//!
//! This crate provides the position types shared by the template scanner and
//! the pointer-keyed source maps produced when templates are assembled into
//! a single JSON document. It lets a consumer that only knows a location
//! inside the merged document (a JSON pointer) find the file, line and
//! column of the template text that produced it.
//!
//! # Overview
//!
//! The core types are:
//! - [`Location`] / [`Range`]: byte offset plus 0-indexed row and column
//! - [`FileInformation`]: line-break index for fast offset lookups
//! - [`SourceContext`]: registry of the files read during one parse
//! - [`JsonPointer`]: RFC 6901 address of a node in the merged value
//! - [`SourceMap`]: pointer → [`SourceMapping`] table
//!
//! # Example
//!
//! ```rust
//! use tmpl_json_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! let file_id = ctx.add_file("main.tmpl".into(), "{\n  \"a\": 1\n}".into());
//!
//! let loc = ctx.location(file_id, 4).unwrap();
//! assert_eq!(loc.row, 1);
//! assert_eq!(loc.column, 2);
//!
//! let mut map = SourceMap::new();
//! let pointer = JsonPointer::root().child_key("a");
//! map.insert(SourceMapping::new(pointer.clone(), "main.tmpl", &loc, TokenKind::Literal));
//! assert_eq!(map.lookup(&pointer).unwrap().line, 2);
//! ```

pub mod context;
pub mod file_info;
pub mod mapping;
pub mod pointer;
pub mod types;

pub use context::{SourceContext, SourceFile};
pub use file_info::FileInformation;
pub use mapping::{SourceMap, SourceMapping, TokenKind};
pub use pointer::{JsonPointer, PointerError};
pub use types::{FileId, Location, Range};
