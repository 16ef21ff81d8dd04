/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Loading template sources.
//!
//! The resolver never touches the filesystem directly. It goes through a
//! [`SourceLoader`], which reads files and produces the canonical path used
//! for cycle detection.

use crate::error::{LoadError, LoadResult};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Source of template text.
pub trait SourceLoader {
    /// Read the full text of a file.
    fn read(&self, path: &Path) -> LoadResult<String>;

    /// The canonical form of `path`.
    ///
    /// Two paths naming the same file must canonicalize to the same value.
    /// Fails with [`LoadError::NotFound`] when the file does not exist.
    fn canonicalize(&self, path: &Path) -> LoadResult<PathBuf>;
}

/// Loader backed by the real filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader;

fn not_found_or_io(path: &Path, err: std::io::Error) -> LoadError {
    if err.kind() == std::io::ErrorKind::NotFound {
        LoadError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        LoadError::Io(err)
    }
}

impl SourceLoader for FileSystemLoader {
    fn read(&self, path: &Path) -> LoadResult<String> {
        std::fs::read_to_string(path).map_err(|e| not_found_or_io(path, e))
    }

    fn canonicalize(&self, path: &Path) -> LoadResult<PathBuf> {
        std::fs::canonicalize(path).map_err(|e| not_found_or_io(path, e))
    }
}

/// Loader that serves files from an in-memory map.
///
/// Paths are normalized lexically, so `dir/../a.tmpl` and `./a.tmpl` name
/// the same entry. Useful for tests and for bundled templates.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// Add a file to the loader.
    pub fn add(&mut self, path: impl AsRef<Path>, content: impl Into<String>) -> &mut Self {
        self.files
            .insert(normalize_path(path.as_ref()), content.into());
        self
    }

    /// Create a loader with the given files.
    pub fn with_files(
        files: impl IntoIterator<Item = (impl AsRef<Path>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (path, content) in files {
            loader.add(path, content);
        }
        loader
    }
}

impl SourceLoader for MemoryLoader {
    fn read(&self, path: &Path) -> LoadResult<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn canonicalize(&self, path: &Path) -> LoadResult<PathBuf> {
        let normalized = normalize_path(path);
        if self.files.contains_key(&normalized) {
            Ok(normalized)
        } else {
            Err(LoadError::NotFound {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Lexically resolve `.` and `..` components.
///
/// `..` at the root is dropped; leading `..` of a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compute the target of an import directive.
///
/// - a leading `file://` is stripped
/// - `/`-rooted paths are relative to `base_path`
/// - other absolute paths are kept
/// - anything else is relative to the directory of `referrer`
/// - `extension` is appended when the target has none
///
/// ```
/// use std::path::{Path, PathBuf};
/// use tmpl_json::loader::resolve_import_path;
///
/// let referrer = Path::new("/proj/pages/home.tmpl");
/// let base = Path::new("/proj");
/// assert_eq!(
///     resolve_import_path("file://./header", referrer, base, "tmpl"),
///     PathBuf::from("/proj/pages/header.tmpl")
/// );
/// assert_eq!(
///     resolve_import_path("/shared/nav.json", referrer, base, "tmpl"),
///     PathBuf::from("/proj/shared/nav.json")
/// );
/// ```
pub fn resolve_import_path(
    raw: &str,
    referrer: &Path,
    base_path: &Path,
    extension: &str,
) -> PathBuf {
    let raw = raw.trim();
    let raw = raw.strip_prefix("file://").unwrap_or(raw);
    let target = Path::new(raw);

    let mut joined = if raw.starts_with('/') {
        base_path.join(raw.trim_start_matches('/'))
    } else if target.is_absolute() {
        target.to_path_buf()
    } else {
        referrer.parent().unwrap_or(Path::new(".")).join(target)
    };

    if joined.extension().is_none() && !extension.is_empty() {
        joined.set_extension(extension);
    }
    normalize_path(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("./x.tmpl")), PathBuf::from("x.tmpl"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("a/../../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_resolve_relative_to_referrer() {
        let path = resolve_import_path("parts/footer", Path::new("site/root.tmpl"), Path::new("/ignored"), "tmpl");
        assert_eq!(path, PathBuf::from("site/parts/footer.tmpl"));

        let up = resolve_import_path("../common.tmpl", Path::new("site/pages/a.tmpl"), Path::new("/"), "tmpl");
        assert_eq!(up, PathBuf::from("site/common.tmpl"));
    }

    #[test]
    fn test_resolve_keeps_explicit_extension() {
        let path = resolve_import_path(" data.json ", Path::new("/p/root.tmpl"), Path::new("/p"), "tmpl");
        assert_eq!(path, PathBuf::from("/p/data.json"));
    }

    #[test]
    fn test_resolve_empty_extension_setting() {
        let path = resolve_import_path("header", Path::new("/p/root"), Path::new("/p"), "");
        assert_eq!(path, PathBuf::from("/p/header"));
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::with_files([("dir/a.tmpl", "1"), ("/abs/b.tmpl", "2")]);

        assert_eq!(loader.read(Path::new("./dir/x/../a.tmpl")).unwrap(), "1");
        assert_eq!(
            loader.canonicalize(Path::new("/abs/./b.tmpl")).unwrap(),
            PathBuf::from("/abs/b.tmpl")
        );
        assert!(matches!(
            loader.read(Path::new("missing.tmpl")),
            Err(LoadError::NotFound { .. })
        ));
        assert!(loader.canonicalize(Path::new("missing.tmpl")).is_err());
    }

    #[test]
    fn test_file_system_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.tmpl");
        let err = FileSystemLoader.canonicalize(&missing).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert!(err.to_string().contains("nope.tmpl"));
    }

    #[test]
    fn test_file_system_loader_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tmpl");
        std::fs::write(&path, "{\"a\": 1}").unwrap();

        let loader = FileSystemLoader;
        assert_eq!(loader.read(&path).unwrap(), "{\"a\": 1}");
        let canon = loader.canonicalize(&path).unwrap();
        assert!(canon.is_absolute());
    }
}
