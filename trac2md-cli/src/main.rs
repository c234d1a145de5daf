use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod error;
mod pages;
mod subcommands;

/// Convert Trac wiki markup to GitHub-flavoured Markdown
#[derive(Parser, Debug)]
#[command(name = "trac2md", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert wiki pages or ticket text to Markdown
    Convert(subcommands::convert::Args),
    /// Print the heading anchors of a set of wiki pages as JSON
    Anchors(subcommands::anchors::Args),
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Convert(args) => subcommands::convert::run(args),
        Commands::Anchors(args) => subcommands::anchors::run(args),
    }
}
