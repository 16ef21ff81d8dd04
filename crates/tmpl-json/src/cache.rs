/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Content-addressed cache of parse results.
//!
//! Entries are keyed by the SHA-256 of the canonical root path, the root
//! text and the options fingerprint. Each entry remembers the hash of every
//! file the parse read; a hit is only served while all of them still hash
//! the same.

use crate::error::ParseErrorKind;
use crate::loader::{SourceLoader, normalize_path};
use crate::options::ParseOptions;
use crate::parse_with_loader;
use crate::result::ParseResult;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Hex-encoded SHA-256 of `content`.
pub fn sha256_hex(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[derive(Debug)]
struct CacheEntry {
    result: Arc<ParseResult>,
    inserted: Instant,
}

/// Thread-safe cache of immutable parse results.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `ttl` are treated as absent.
    pub fn with_ttl(ttl: Duration) -> Self {
        ParseCache {
            entries: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Cache key for a root file.
    pub fn key(canonical_root: &str, content: &str, options: &ParseOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical_root.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hasher.update([0u8]);
        hasher.update(options.fingerprint().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Return the cached result for `root`, parsing on a miss.
    ///
    /// A root that cannot be read is parsed (and fails) without touching
    /// the cache. Cancelled parses are not stored.
    pub fn get_or_parse(
        &self,
        root: impl AsRef<Path>,
        options: &ParseOptions,
        loader: &dyn SourceLoader,
    ) -> Arc<ParseResult> {
        let root = root.as_ref();
        let root_path = normalize_path(&options.base_path.join(root));
        let loaded = loader
            .canonicalize(&root_path)
            .and_then(|canonical| Ok((loader.read(&canonical)?, canonical)));
        let Ok((content, canonical)) = loaded else {
            return Arc::new(parse_with_loader(root, options, loader));
        };

        let key = Self::key(&canonical.display().to_string(), &content, options);
        if let Some(hit) = self.get(&key, loader) {
            tracing::debug!(root = %canonical.display(), "Parse cache hit");
            return hit;
        }
        tracing::debug!(root = %canonical.display(), "Parse cache miss");

        let result = parse_with_loader(root, options, loader);
        if result.errors_of_kind(ParseErrorKind::Cancelled).next().is_some() {
            return Arc::new(result);
        }
        self.insert(key, result, loader)
    }

    /// A fresh entry for `key`, if there is one.
    ///
    /// Dependencies are re-read after the lock is released.
    pub fn get(&self, key: &str, loader: &dyn SourceLoader) -> Option<Arc<ParseResult>> {
        let (result, inserted) = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let entry = entries.get(key)?;
            (Arc::clone(&entry.result), entry.inserted)
        };
        self.is_fresh(&result, inserted, loader).then_some(result)
    }

    /// Store `result` unless a fresh entry already exists; returns whichever
    /// result is now cached.
    ///
    /// Freshness is checked before the write lock is taken. An entry another
    /// thread stored after that check is kept.
    pub fn insert(
        &self,
        key: String,
        result: ParseResult,
        loader: &dyn SourceLoader,
    ) -> Arc<ParseResult> {
        let checked = Instant::now();
        if let Some(existing) = self.get(&key, loader) {
            return existing;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(&key)
            && existing.inserted >= checked
        {
            return Arc::clone(&existing.result);
        }
        let result = Arc::new(result);
        entries.insert(
            key,
            CacheEntry {
                result: Arc::clone(&result),
                inserted: Instant::now(),
            },
        );
        result
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop entries older than the TTL. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted.elapsed() <= ttl);
        before - entries.len()
    }

    fn is_fresh(&self, result: &ParseResult, inserted: Instant, loader: &dyn SourceLoader) -> bool {
        if let Some(ttl) = self.ttl
            && inserted.elapsed() > ttl
        {
            return false;
        }
        result.dependencies.iter().all(|dep| {
            let current = loader.read(Path::new(&dep.path)).ok().map(|c| sha256_hex(&c));
            current == dep.sha256
        })
    }
}
