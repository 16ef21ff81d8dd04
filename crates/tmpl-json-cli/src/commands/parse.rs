/*
 * parse.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `tmpl-json parse`: print the full parse result as JSON.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use super::ParseFlags;

#[derive(Debug)]
pub struct ParseArgs {
    pub root: String,
    pub flags: ParseFlags,
    pub pretty: bool,
}

/// Execute the parse command. Returns `false` when the parse collected
/// errors; the result is printed either way.
pub fn execute(args: ParseArgs, out: &mut impl Write) -> Result<bool> {
    let options = args.flags.to_options()?;
    let result = tmpl_json::parse(&args.root, &options);

    info!(
        root = %args.root,
        imports = result.stats.import_count,
        errors = result.errors.len(),
        "Parsed template"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("Failed to serialize parse result")?;
    writeln!(out, "{}", json).context("Failed to write output")?;

    Ok(result.is_ok())
}
