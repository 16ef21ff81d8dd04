/*
 * locate.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `tmpl-json locate`: translate JSON pointers back to template positions.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::warn;

use super::ParseFlags;

#[derive(Debug)]
pub struct LocateArgs {
    pub root: String,
    pub pointers: Vec<String>,
    pub flags: ParseFlags,
}

/// Print `pointer -> file:line:column` for each pointer. Pointers with no
/// recorded origin print `pointer -> ?`.
pub fn execute(args: LocateArgs, out: &mut impl Write) -> Result<bool> {
    let mut options = args.flags.to_options()?;
    options.build_source_map = true;
    let result = tmpl_json::parse(&args.root, &options);

    for error in &result.errors {
        warn!("{}", error);
    }

    for pointer in &args.pointers {
        match result.locate(pointer) {
            Some(origin) => writeln!(out, "{} -> {}", pointer, origin),
            None => writeln!(out, "{} -> ?", pointer),
        }
        .context("Failed to write output")?;
    }

    Ok(result.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_locates_pointers_across_files() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(
            temp.path().join("root.tmpl"),
            "// [Header](file://./header.tmpl)\n{\"items\": [{{ header }}]}",
        )
        .expect("write root");
        fs::write(temp.path().join("header.tmpl"), "{\n  \"text\": \"Hi\"\n}")
            .expect("write header");

        let args = LocateArgs {
            root: "root.tmpl".to_string(),
            pointers: vec!["/items/0/text".to_string(), "/items".to_string()],
            flags: ParseFlags {
                base_path: Some(temp.path().to_path_buf()),
                // locate always needs the map
                no_source_map: true,
                ..Default::default()
            },
        };
        let mut out = Vec::new();
        let ok = execute(args, &mut out).expect("locate command");
        let printed = String::from_utf8(out).expect("utf-8 output");
        let lines: Vec<&str> = printed.lines().collect();

        assert!(ok);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("/items/0/text -> "), "{}", lines[0]);
        assert!(lines[0].ends_with("header.tmpl:2:3"), "{}", lines[0]);
        assert!(lines[1].ends_with("root.tmpl:2:2"), "{}", lines[1]);
    }
}
