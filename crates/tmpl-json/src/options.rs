/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Parse configuration.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default limit on nested imports.
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 10;

/// Extension appended to import paths written without one.
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "tmpl";

/// Options for one parse.
///
/// Deserializes from camelCase keys with every field optional:
///
/// ```
/// use tmpl_json::ParseOptions;
///
/// let options: ParseOptions =
///     serde_json::from_str(r#"{"maxImportDepth": 3, "defaultValues": {"count": 7}}"#).unwrap();
/// assert_eq!(options.max_import_depth, 3);
/// assert!(options.build_source_map);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Import a file that is already being assembled without reporting
    /// an error. The back-edge still splices `null`.
    pub allow_recursive_imports: bool,
    pub max_import_depth: usize,
    /// Project root. `/`-rooted import paths and the root path are
    /// resolved against it.
    pub base_path: PathBuf,
    /// Values for `{{ … }}` expressions, by expression or variable name.
    pub default_values: BTreeMap<String, Value>,
    pub build_source_map: bool,
    pub template_extension: String,
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            allow_recursive_imports: false,
            max_import_depth: DEFAULT_MAX_IMPORT_DEPTH,
            base_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            default_values: BTreeMap::new(),
            build_source_map: true,
            template_extension: DEFAULT_TEMPLATE_EXTENSION.to_string(),
            cancellation: None,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = depth;
        self
    }

    pub fn with_allow_recursive_imports(mut self, allow: bool) -> Self {
        self.allow_recursive_imports = allow;
        self
    }

    pub fn with_default_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.default_values.insert(name.into(), value);
        self
    }

    pub fn with_default_values(mut self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.default_values.extend(values);
        self
    }

    pub fn with_source_map(mut self, build: bool) -> Self {
        self.build_source_map = build;
        self
    }

    pub fn with_template_extension(mut self, extension: impl Into<String>) -> Self {
        self.template_extension = extension.into();
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Stable text covering every option that changes the output.
    pub fn fingerprint(&self) -> String {
        let defaults = serde_json::to_string(&self.default_values).unwrap_or_default();
        format!(
            "base={};recursive={};depth={};map={};ext={};defaults={}",
            self.base_path.display(),
            self.allow_recursive_imports,
            self.max_import_depth,
            self.build_source_map,
            self.template_extension,
            defaults
        )
    }
}

/// Shared flag for stopping a parse from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
