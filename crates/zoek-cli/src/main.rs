mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "zoek",
    version,
    about = "Mirror a repository catalog into local clones and a code search index"
)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Config file (default: ~/.zoek/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    commands::run(cli.command, cli.config.as_deref()).await
}
