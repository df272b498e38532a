//! Pagewright CLI.
//!
//! Provides commands for:
//! - `serve`: Start the HTTP server
//! - `generate`: Generate or revise one page
//! - `list`: List published pages
//! - `delete`: Delete a page and its metadata

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DeleteArgs, GenerateArgs, ListArgs, ServeArgs};
use output::Output;

/// Pagewright - AI page generation.
#[derive(Parser)]
#[command(name = "pw", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve(ServeArgs),
    /// Generate a page, or revise it if it exists.
    Generate(GenerateArgs),
    /// List published pages, newest first.
    List(ListArgs),
    /// Delete a page and its metadata.
    Delete(DeleteArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Serve(args) => args.common.verbose,
            Self::Generate(args) => args.common.verbose,
            Self::List(args) => args.common.verbose,
            Self::Delete(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async {
        match cli.command {
            Commands::Serve(args) => args.execute().await,
            Commands::Generate(args) => args.execute().await,
            Commands::List(args) => args.execute().await,
            Commands::Delete(args) => args.execute().await,
        }
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
