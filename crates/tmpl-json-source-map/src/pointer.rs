//! RFC 6901 JSON pointers
//!
//! A [`JsonPointer`] addresses one node of the merged document. It is kept in
//! its encoded string form (`/elements/0/text`) because pointers are compared,
//! hashed and re-prefixed far more often than they are split apart.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// An RFC 6901 JSON pointer in encoded form
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPointer {
    encoded: String,
}

/// Errors produced when parsing a pointer string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// A non-empty pointer must start with '/'
    MissingLeadingSlash(String),
    /// '~' must be followed by '0' or '1'
    InvalidEscape(String),
}

impl fmt::Display for PointerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerError::MissingLeadingSlash(p) => {
                write!(f, "JSON pointer '{}' must be empty or start with '/'", p)
            }
            PointerError::InvalidEscape(p) => {
                write!(f, "JSON pointer '{}' contains an invalid '~' escape", p)
            }
        }
    }
}

impl std::error::Error for PointerError {}

/// Escape one reference token (`~` → `~0`, `/` → `~1`)
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

impl JsonPointer {
    /// The pointer to the whole document (the empty string)
    pub fn root() -> Self {
        JsonPointer {
            encoded: String::new(),
        }
    }

    /// Parse an encoded pointer
    ///
    /// ```
    /// use tmpl_json_source_map::JsonPointer;
    ///
    /// let p = JsonPointer::parse("/a~1b/0").unwrap();
    /// assert_eq!(p.as_str(), "/a~1b/0");
    /// assert!(JsonPointer::parse("a").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PointerError> {
        if !s.is_empty() && !s.starts_with('/') {
            return Err(PointerError::MissingLeadingSlash(s.to_string()));
        }
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '~' && !matches!(chars.peek(), Some('0') | Some('1')) {
                return Err(PointerError::InvalidEscape(s.to_string()));
            }
        }
        Ok(JsonPointer {
            encoded: s.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Append an object member name
    pub fn push_key(&mut self, key: &str) {
        self.encoded.push('/');
        self.encoded.push_str(&escape_token(key));
    }

    /// Append an array index
    pub fn push_index(&mut self, index: usize) {
        self.encoded.push('/');
        self.encoded.push_str(&index.to_string());
    }

    pub fn child_key(&self, key: &str) -> Self {
        let mut child = self.clone();
        child.push_key(key);
        child
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut child = self.clone();
        child.push_index(index);
        child
    }

    /// Re-root `suffix` under this pointer
    ///
    /// ```
    /// use tmpl_json_source_map::JsonPointer;
    ///
    /// let splice = JsonPointer::parse("/elements/0").unwrap();
    /// let inner = JsonPointer::parse("/text").unwrap();
    /// assert_eq!(splice.join(&inner).as_str(), "/elements/0/text");
    /// assert_eq!(splice.join(&JsonPointer::root()), splice);
    /// ```
    pub fn join(&self, suffix: &JsonPointer) -> JsonPointer {
        let mut encoded = String::with_capacity(self.encoded.len() + suffix.encoded.len());
        encoded.push_str(&self.encoded);
        encoded.push_str(&suffix.encoded);
        JsonPointer { encoded }
    }

    /// The pointer one level up, or None for the root
    pub fn parent(&self) -> Option<JsonPointer> {
        let idx = self.encoded.rfind('/')?;
        Some(JsonPointer {
            encoded: self.encoded[..idx].to_string(),
        })
    }

    /// This pointer followed by each ancestor up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = JsonPointer> {
        std::iter::successors(Some(self.clone()), |p| p.parent())
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = PointerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        JsonPointer::parse(&value)
    }
}

impl From<JsonPointer> for String {
    fn from(value: JsonPointer) -> Self {
        value.encoded
    }
}
