//! tmpl-json CLI - Main entry point

use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::ParseFlags;

#[derive(Parser)]
#[command(name = "tmpl-json")]
#[command(version)]
#[command(about = "Extract JSON from templated JSON sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a template and print the result as JSON
    Parse {
        /// Root template, relative to --base-path
        root: String,

        #[command(flatten)]
        flags: ParseFlags,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print where each JSON pointer of the extracted value was written
    Locate {
        /// Root template, relative to --base-path
        root: String,

        /// JSON pointers such as /elements/0/text
        #[arg(required = true)]
        pointers: Vec<String>,

        #[command(flatten)]
        flags: ParseFlags,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tmpl_json=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether the parse finished without collected errors.
fn run() -> Result<bool> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Parse {
            root,
            flags,
            pretty,
        } => commands::parse::execute(
            commands::parse::ParseArgs {
                root,
                flags,
                pretty,
            },
            &mut stdout,
        ),
        Commands::Locate {
            root,
            pointers,
            flags,
        } => commands::locate::execute(
            commands::locate::LocateArgs {
                root,
                pointers,
                flags,
            },
            &mut stdout,
        ),
    }
}
