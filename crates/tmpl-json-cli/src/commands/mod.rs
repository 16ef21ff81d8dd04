//! Command implementations for the tmpl-json CLI
//!
//! Each command turns its arguments into [`ParseOptions`] and delegates to
//! the `tmpl-json` library.

pub mod locate;
pub mod parse;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tmpl_json::ParseOptions;

/// Options shared by every command that runs a parse
#[derive(Args, Debug, Default, Clone)]
pub struct ParseFlags {
    /// Directory that root paths and '/'-rooted imports resolve against
    #[arg(long, value_name = "DIR")]
    pub base_path: Option<PathBuf>,

    /// Maximum import nesting depth
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Follow import cycles instead of reporting them
    #[arg(long)]
    pub allow_recursive: bool,

    /// Skip building the source map
    #[arg(long)]
    pub no_source_map: bool,

    /// JSON object of variable default values
    #[arg(long, value_name = "FILE")]
    pub defaults: Option<PathBuf>,

    /// Extension added to imports written without one
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,
}

impl ParseFlags {
    pub fn to_options(&self) -> Result<ParseOptions> {
        let mut options = ParseOptions::new()
            .with_allow_recursive_imports(self.allow_recursive)
            .with_source_map(!self.no_source_map);

        if let Some(base_path) = &self.base_path {
            options = options.with_base_path(base_path);
        }
        if let Some(depth) = self.max_depth {
            options = options.with_max_import_depth(depth);
        }
        if let Some(extension) = &self.extension {
            options = options.with_template_extension(extension.trim_start_matches('.'));
        }
        if let Some(path) = &self.defaults {
            options = options.with_default_values(read_defaults(path)?);
        }

        Ok(options)
    }
}

fn read_defaults(path: &PathBuf) -> Result<BTreeMap<String, Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read defaults file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Defaults file is not a JSON object: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flags_map_onto_options() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let defaults = temp.path().join("defaults.json");
        fs::write(&defaults, r#"{"title": "Hello", "count": 3}"#).expect("write defaults");

        let flags = ParseFlags {
            base_path: Some(temp.path().to_path_buf()),
            max_depth: Some(4),
            allow_recursive: true,
            no_source_map: true,
            defaults: Some(defaults),
            extension: Some(".json5".to_string()),
        };
        let options = flags.to_options().expect("options");

        assert_eq!(options.base_path, temp.path());
        assert_eq!(options.max_import_depth, 4);
        assert!(options.allow_recursive_imports);
        assert!(!options.build_source_map);
        assert_eq!(options.template_extension, "json5");
        assert_eq!(options.default_values.get("title"), Some(&json!("Hello")));
        assert_eq!(options.default_values.get("count"), Some(&json!(3)));
    }

    #[test]
    fn test_defaults_must_be_an_object() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let defaults = temp.path().join("defaults.json");
        fs::write(&defaults, "[1, 2]").expect("write defaults");

        let flags = ParseFlags {
            defaults: Some(defaults),
            ..Default::default()
        };
        let err = flags.to_options().unwrap_err();
        assert!(format!("{:#}", err).contains("not a JSON object"));
    }

    #[test]
    fn test_missing_defaults_file() {
        let flags = ParseFlags {
            defaults: Some(PathBuf::from("/definitely/not/here.json")),
            ..Default::default()
        };
        let err = flags.to_options().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read defaults file"));
    }
}
