mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, id::IdSubcommand, sprint::SprintSubcommand};
use gitta_core::CancelToken;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gitta",
    about = "Plain-file sprints and stories inside your git repository",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .gitta/ or .git/)
    #[arg(long, global = true, env = "GITTA_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize gitta in the current repository
    Init,

    /// Manage sprints
    Sprint {
        #[command(subcommand)]
        subcommand: SprintSubcommand,
    },

    /// Find sprints whose folder name and status file disagree
    Doctor {
        /// Rename folders to match their status files
        #[arg(long)]
        fix: bool,
    },

    /// Issue sequential story identifiers
    Id {
        #[command(subcommand)]
        subcommand: IdSubcommand,
    },

    /// Inspect the repository configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let cancel = install_cancel_handler();

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Sprint { subcommand } => cmd::sprint::run(&root, subcommand, &cancel, cli.json),
        Commands::Doctor { fix } => cmd::doctor::run(&root, fix, &cancel, cli.json),
        Commands::Id { subcommand } => cmd::id::run(&root, subcommand, &cancel, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Ctrl-C cancels the running operation instead of killing the process
/// mid-write; a second Ctrl-C exits immediately.
fn install_cancel_handler() -> CancelToken {
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if handle.is_cancelled() {
            std::process::exit(130);
        }
        handle.cancel();
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    cancel
}
