/*
 * defaults.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder values for `{{ … }}` expressions.
//!
//! Expressions are never evaluated. A variable stands for a value whose
//! shape is guessed from its name, unless the caller supplied an override.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The closed set of placeholder shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultShape {
    Boolean,
    Number,
    EmptyList,
    EmptyObject,
    EmptyString,
}

impl DefaultShape {
    /// Pick a shape from a variable name.
    ///
    /// The rules are checked in order against the lowercased last dotted
    /// segment (`page.isVisible` is judged by `isvisible`):
    ///
    /// ```
    /// use tmpl_json::defaults::DefaultShape;
    ///
    /// assert_eq!(DefaultShape::infer("isEnabled"), DefaultShape::Boolean);
    /// assert_eq!(DefaultShape::infer("user.itemCount"), DefaultShape::Number);
    /// assert_eq!(DefaultShape::infer("menuItems"), DefaultShape::EmptyList);
    /// assert_eq!(DefaultShape::infer("config"), DefaultShape::EmptyObject);
    /// assert_eq!(DefaultShape::infer("label"), DefaultShape::EmptyString);
    /// assert_eq!(DefaultShape::infer("hasfoo"), DefaultShape::Boolean);
    /// ```
    pub fn infer(name: &str) -> DefaultShape {
        let segment = name.rsplit('.').next().unwrap_or(name);
        let lower = segment.to_lowercase();

        if lower.starts_with("is") || lower.starts_with("has") {
            DefaultShape::Boolean
        } else if ["count", "size", "length"].iter().any(|w| lower.contains(w)) {
            DefaultShape::Number
        } else if ["list", "items", "array"].iter().any(|w| lower.contains(w)) {
            DefaultShape::EmptyList
        } else if ["data", "config", "options"].iter().any(|w| lower.contains(w)) {
            DefaultShape::EmptyObject
        } else {
            DefaultShape::EmptyString
        }
    }

    pub fn value(&self) -> Value {
        match self {
            DefaultShape::Boolean => Value::Bool(false),
            DefaultShape::Number => Value::from(0),
            DefaultShape::EmptyList => Value::Array(Vec::new()),
            DefaultShape::EmptyObject => Value::Object(Map::new()),
            DefaultShape::EmptyString => Value::String(String::new()),
        }
    }
}

/// The leading identifier of an expression: `user.name | upper` → `user.name`.
pub fn variable_name(expr: &str) -> &str {
    let expr = expr.trim();
    let end = expr
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '-')))
        .map(|(i, _)| i)
        .unwrap_or(expr.len());
    &expr[..end]
}

/// Value for a variable that is not bound to an import.
///
/// Overrides are looked up by the whole trimmed expression first, then by
/// its leading identifier; the name heuristic applies otherwise.
pub fn default_value(expr: &str, overrides: &BTreeMap<String, Value>) -> Value {
    let expr = expr.trim();
    if let Some(value) = overrides.get(expr) {
        return value.clone();
    }
    let name = variable_name(expr);
    if let Some(value) = overrides.get(name) {
        return value.clone();
    }
    DefaultShape::infer(name).value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_documented_examples() {
        let overrides = BTreeMap::new();
        let got: Vec<Value> = ["isEnabled", "count", "items", "config", "label"]
            .iter()
            .map(|n| default_value(n, &overrides))
            .collect();
        assert_eq!(got, vec![json!(false), json!(0), json!([]), json!({}), json!("")]);
    }

    #[test]
    fn test_rules_are_ordered() {
        // predicate wins over "count"
        assert_eq!(DefaultShape::infer("hasCount"), DefaultShape::Boolean);
        // number wins over list
        assert_eq!(DefaultShape::infer("listSize"), DefaultShape::Number);
        // list wins over object
        assert_eq!(DefaultShape::infer("dataItems"), DefaultShape::EmptyList);
    }

    #[test]
    fn test_case_insensitive_last_segment() {
        assert_eq!(DefaultShape::infer("site.MenuItems"), DefaultShape::EmptyList);
        assert_eq!(DefaultShape::infer("counts.title"), DefaultShape::EmptyString);
        assert_eq!(DefaultShape::infer("page.is_draft"), DefaultShape::Boolean);
        assert_eq!(DefaultShape::infer("IS_OPEN"), DefaultShape::Boolean);
    }

    #[test]
    fn test_any_is_or_has_prefix_is_boolean() {
        for name in ["is", "isenabled", "island", "hasfoo", "HASH", "page.isOpen"] {
            assert_eq!(DefaultShape::infer(name), DefaultShape::Boolean, "{}", name);
        }
        assert_eq!(DefaultShape::infer("this"), DefaultShape::EmptyString);
    }

    #[test]
    fn test_variable_name() {
        assert_eq!(variable_name("  user.name | upper "), "user.name");
        assert_eq!(variable_name("nav-items"), "nav-items");
        assert_eq!(variable_name("header()"), "header");
        assert_eq!(variable_name(""), "");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut overrides = BTreeMap::new();
        overrides.insert("count".to_string(), json!(42));
        overrides.insert("title | upper".to_string(), json!("TITLE"));

        assert_eq!(default_value("count", &overrides), json!(42));
        assert_eq!(default_value("count | round", &overrides), json!(42));
        assert_eq!(default_value(" title | upper ", &overrides), json!("TITLE"));
        assert_eq!(default_value("title", &overrides), json!(""));
    }
}
