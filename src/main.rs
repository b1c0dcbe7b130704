mod commands;
mod diagnostics;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "defref", about = "Cross-reference definitions and their uses across markdown")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every definition and reference without writing output
    Check,
    /// Print the reverse index of every definition as JSON
    Index,
    /// List where a definition is referenced, as path#anchor lines
    Refs {
        /// Definition name or alias (or identifier with --id)
        query: String,
        /// Look the definition up by identifier instead of name
        #[arg(long)]
        id: bool,
    },
    /// Render every markdown document into the output directory
    Render {
        /// Output directory (overrides `output` in .defref.toml)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Log to stderr, filtered by `DEFREF_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("DEFREF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check => commands::check(),
        Commands::Index => commands::index(),
        Commands::Refs { query, id } => commands::refs(&query, id),
        Commands::Render { out } => commands::render(out),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}
