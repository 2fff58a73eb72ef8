mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "handoff",
    about = "Turn planning documents into a synchronized implementation checklist and briefing",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .handoff/ or .git/)
    #[arg(long, global = true, env = "HANDOFF_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full planning-to-implementation transition
    Transition,

    /// Rescan the planning documents and rewrite the spec index
    Index,

    /// Rebuild the project briefing document
    Briefing,

    /// Show the current workflow phase
    Status,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Transition => cmd::transition::run(&root, cli.json),
        Commands::Index => cmd::index::run(&root),
        Commands::Briefing => cmd::briefing::run(&root),
        Commands::Status => cmd::status::run(&root, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
