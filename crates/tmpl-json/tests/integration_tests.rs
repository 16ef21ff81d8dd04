/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for tmpl-json using test fixtures.
 */

use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::{Path, PathBuf};
use tmpl_json::{
    CancellationToken, ParseErrorKind, ParseOptions, ParseResult, TokenKind, parse, parse_str,
};

/// Helper to get the path to a fixture directory
fn fixture_dir(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

/// Parse `root` inside the fixture directory `dir`
fn parse_fixture(dir: &str, root: &str, options: ParseOptions) -> ParseResult {
    parse(root, &options.with_base_path(fixture_dir(dir)))
}

#[test]
fn test_scenario_header_splice() {
    let result = parse_fixture("scenario", "root.tmpl", ParseOptions::new());

    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
    assert_eq!(
        result.extracted_value,
        json!({"type": "Stack", "elements": [{"type": "Text", "text": "Hi"}]})
    );

    let text = result.locate("/elements/0/text").unwrap();
    assert!(text.source_file.ends_with("header.tmpl"), "{}", text.source_file);
    assert_eq!((text.line, text.column), (1, 16));

    let splice = result.locate("/elements/0").unwrap();
    assert!(splice.source_file.ends_with("root.tmpl"));
    assert_eq!(splice.line, 2);
    assert_eq!(splice.token_kind, TokenKind::Variable);

    assert_eq!(result.imports.len(), 1);
    let import = &result.imports[0];
    assert_eq!(import.original_path, "file://./header.tmpl");
    assert_eq!(import.description, "Header");
    assert!(import.resolved_path.ends_with("header.tmpl"));
    assert_eq!(import.directive_span.start_line, 1);
    assert_eq!(import.parsed_value, json!({"type": "Text", "text": "Hi"}));
    assert!(!import.is_recursive);
}

#[test]
fn test_cycle_terminates_with_one_error() {
    let result = parse_fixture("cycle", "a.tmpl", ParseOptions::new());

    assert_eq!(
        result.extracted_value,
        json!({"name": "a", "children": [{"name": "b", "back": [null]}]})
    );

    let cycles: Vec<_> = result.errors_of_kind(ParseErrorKind::CircularImport).collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(result.errors.len(), 1);
    let error = cycles[0];
    assert!(error.is_import_cycle());
    assert!(error.file.ends_with("b.tmpl"));
    assert_eq!((error.line, error.column), (4, 5));

    assert_eq!(result.imports.len(), 2);
    assert!(!result.imports[0].is_recursive);
    assert!(result.imports[1].is_recursive);
    assert_eq!(result.imports[1].parsed_value, json!(null));
}

#[test]
fn test_cycle_allowed_records_no_error() {
    let options = ParseOptions::new().with_allow_recursive_imports(true);
    let result = parse_fixture("cycle", "a.tmpl", options);

    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.extracted_value["children"][0]["back"], json!([null]));
    assert!(result.imports[1].is_recursive);
    // The back-edge contributes nothing below its splice point
    assert!(
        result
            .source_map
            .iter()
            .all(|m| !m.pointer.as_str().starts_with("/children/0/back/0/"))
    );
}

#[test]
fn test_position_fidelity_across_files() {
    let result = parse_fixture("position", "a.tmpl", ParseOptions::new());
    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);

    let field = result.locate("/items/0/meta/field").unwrap();
    assert!(field.source_file.ends_with("b.tmpl"), "{}", field.source_file);
    assert_eq!(field.line, 5);
    assert_eq!(field.column, 5);
    assert_eq!(field.token_kind, TokenKind::Literal);

    let splice = result.locate("/items/0").unwrap();
    assert!(splice.source_file.ends_with("a.tmpl"));
    assert_eq!((splice.line, splice.column), (3, 5));
    assert_eq!(splice.token_kind, TokenKind::ImportDirective);

    // Unmapped pointers fall back to the closest mapped ancestor
    let missing = result.locate("/items/0/meta/absent").unwrap();
    assert!(missing.source_file.ends_with("b.tmpl"));
    assert_eq!(missing.line, 3);
}

#[test]
fn test_default_value_inference() {
    let result = parse_fixture("defaults", "page.tmpl", ParseOptions::new());
    assert!(result.is_ok());
    assert_eq!(
        result.extracted_value,
        json!({"enabled": false, "count": 0, "items": [], "config": {}, "label": ""})
    );
    assert_eq!(result.stats.variable_count, 5);

    let options = ParseOptions::new()
        .with_default_value("count", json!(3))
        .with_default_value("label", json!("Total"));
    let result = parse_fixture("defaults", "page.tmpl", options);
    assert_eq!(result.extracted_value["count"], json!(3));
    assert_eq!(result.extracted_value["label"], json!("Total"));
}

#[test]
fn test_site_with_rooted_paths_controls_and_comments() {
    let result = parse_fixture("site", "pages/home.tmpl", ParseOptions::new());

    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
    assert_eq!(
        result.extracted_value,
        json!({
            "type": "Page",
            "title": " | Home",
            "nav": {"type": "Nav", "links": ""},
            "sections": [{"heading": "", "visible": false}],
            "footer": {"type": "Footer", "text": "© 2025"}
        })
    );

    assert_eq!(result.stats.import_count, 2);
    assert_eq!(result.stats.variable_count, 6);
    assert_eq!(result.stats.control_count, 2);
    assert!(result.stats.total_size_bytes > 0);

    let links = result.locate("/nav/links").unwrap();
    assert!(links.source_file.ends_with("nav.tmpl"));
    assert_eq!((links.line, links.column), (3, 3));

    let footer_text = result.locate("/footer/text").unwrap();
    assert!(footer_text.source_file.ends_with("footer.json"));
}

#[test]
fn test_nested_failures_are_not_fatal() {
    let result = parse_fixture("broken", "root.tmpl", ParseOptions::new());

    assert_eq!(
        result.extracted_value,
        json!({"good": [null], "bad": [{"kept": 1}], "after": true})
    );

    let kinds: Vec<ParseErrorKind> = result.errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![ParseErrorKind::FileNotFound, ParseErrorKind::ParseError]
    );

    let missing = &result.errors[0];
    assert!(missing.file.ends_with("root.tmpl"));
    assert_eq!((missing.line, missing.column), (3, 5));

    let malformed = &result.errors[1];
    assert!(malformed.file.ends_with("bad.tmpl"));
    assert_eq!((malformed.line, malformed.column), (3, 11));
    assert!(malformed.to_string().starts_with("parse_error: "));
}

#[test]
fn test_missing_root_is_the_only_error() {
    let result = parse_fixture("scenario", "nope.tmpl", ParseOptions::new());
    assert_eq!(result.extracted_value, json!(null));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ParseErrorKind::FileNotFound);
    assert!(result.imports.is_empty());
    assert!(result.source_map.is_empty());
}

#[test]
fn test_parses_are_idempotent() {
    let first = parse_fixture("site", "pages/home.tmpl", ParseOptions::new());
    let second = parse_fixture("site", "pages/home.tmpl", ParseOptions::new());

    assert_eq!(
        serde_json::to_string(&first.extracted_value).unwrap(),
        serde_json::to_string(&second.extracted_value).unwrap()
    );
    let keys = |r: &ParseResult| -> Vec<String> {
        r.source_map.iter().map(|m| m.pointer.to_string()).collect()
    };
    assert_eq!(keys(&first), keys(&second));
    assert_eq!(
        serde_json::to_value(&first.source_map).unwrap(),
        serde_json::to_value(&second.source_map).unwrap()
    );
}

#[test]
fn test_cancellation_yields_partial_result() {
    let token = CancellationToken::new();
    token.cancel();
    let result = parse_fixture(
        "site",
        "pages/home.tmpl",
        ParseOptions::new().with_cancellation(token),
    );

    let cancelled: Vec<_> = result.errors_of_kind(ParseErrorKind::Cancelled).collect();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.extracted_value["nav"], json!(null));
    assert_eq!(result.extracted_value["footer"], json!(null));
    assert_eq!(result.extracted_value["type"], json!("Page"));
}

#[test]
fn test_tempdir_project_and_parse_str() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("parts")).unwrap();
    std::fs::write(dir.path().join("parts/item.tmpl"), "{\"id\": {{ itemId }}}").unwrap();
    std::fs::write(
        dir.path().join("root.tmpl"),
        "[\n  // [Item](parts/item)\n  , 2\n]",
    )
    .unwrap();

    let options = ParseOptions::new().with_base_path(dir.path());
    let result = parse("root.tmpl", &options);
    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.extracted_value, json!([{"id": ""}, 2]));

    // In-memory root text still resolves imports relative to its path
    let result = parse_str("virtual.tmpl", "{\"x\": [\n  // [Item](parts/item.tmpl)\n]}", &options);
    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.extracted_value, json!({"x": [{"id": ""}]}));
}

fn write_chain(dir: &Path, length: usize) {
    for i in 0..length {
        let body = format!("[\n  // [Next](file://./f{}.tmpl)\n]", i + 1);
        std::fs::write(dir.join(format!("f{}.tmpl", i)), body).unwrap();
    }
    std::fs::write(dir.join(format!("f{}.tmpl", length)), "1").unwrap();
}

#[test]
fn test_depth_limit_on_long_chain() {
    let dir = tempfile::tempdir().unwrap();
    write_chain(dir.path(), 1000);

    let limited = ParseOptions::new()
        .with_base_path(dir.path())
        .with_max_import_depth(999);
    let result = parse("f0.tmpl", &limited);
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.kind == ParseErrorKind::CircularImport && e.is_depth_exceeded())
    );
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.imports.len(), 1000);

    let unlimited = ParseOptions::new()
        .with_base_path(dir.path())
        .with_max_import_depth(1000)
        .with_source_map(false);
    let result = parse("f0.tmpl", &unlimited);
    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);

    let mut value = &result.extracted_value;
    let mut depth = 0;
    while let Some(inner) = value.get(0) {
        value = inner;
        depth += 1;
    }
    assert_eq!(depth, 1000);
    assert_eq!(*value, json!(1));
}

#[test]
fn test_deeply_nested_arrays_in_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let levels = 2000;
    let text = format!("{}0{}", "[".repeat(levels), "]".repeat(levels));
    std::fs::write(dir.path().join("deep.tmpl"), text).unwrap();

    let options = ParseOptions::new()
        .with_base_path(dir.path())
        .with_source_map(false);
    let result = parse("deep.tmpl", &options);
    assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);

    let mut value = &result.extracted_value;
    let mut depth = 0;
    while let Some(inner) = value.get(0) {
        value = inner;
        depth += 1;
    }
    assert_eq!(depth, levels);
}

#[test]
fn test_default_depth_limit() {
    let dir = tempfile::tempdir().unwrap();
    write_chain(dir.path(), 12);

    let result = parse("f0.tmpl", &ParseOptions::new().with_base_path(dir.path()));
    let depth_errors: Vec<_> = result.errors.iter().filter(|e| e.is_depth_exceeded()).collect();
    assert_eq!(depth_errors.len(), 1);
    assert_eq!(depth_errors[0].kind, ParseErrorKind::CircularImport);
    assert!(depth_errors[0].message.contains("max import depth exceeded"));
    // f0 holds ten spliced levels, the eleventh import is refused
    assert_eq!(result.imports.len(), 11);
}
