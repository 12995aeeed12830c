//! Palisade - deletion gate for agent shell commands

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Use the library crate
use palisade::install;
use palisade::{run_gate, Verdict};

#[derive(Parser, Debug)]
#[command(name = "palisade")]
#[command(about = "Blocks agent shell commands that delete files outside the working directory")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register the gate as a PreToolUse hook in the agent settings
    Install {
        /// Skip adding ask-confirmation patterns for the deletion commands
        #[arg(long)]
        no_ask_permissions: bool,

        /// Settings file to edit instead of ~/.claude/settings.json
        #[arg(long, value_name = "FILE", env = "PALISADE_SETTINGS")]
        settings: Option<std::path::PathBuf>,
    },
    /// Remove the hook entry and permissions that install added
    Uninstall {
        /// Settings file to edit instead of ~/.claude/settings.json
        #[arg(long, value_name = "FILE", env = "PALISADE_SETTINGS")]
        settings: Option<std::path::PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };

    // Exit code and stderr are what the agent reads back, so logs share
    // stderr and stay quiet unless --debug is set
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match args.command {
        Some(Command::Install {
            no_ask_permissions,
            settings,
        }) => install::run_install(no_ask_permissions, settings),
        Some(Command::Uninstall { settings }) => install::run_uninstall(settings),
        None => run_once(),
    }
}

/// Reads one hook request from stdin and exits with its verdict.
///
/// Exit 0 lets the command run; exit 2 blocks it and the diagnostic on
/// stderr tells the agent why.
fn run_once() -> Result<()> {
    let verdict = run_gate()?;
    if let Verdict::Block(blocked) = verdict {
        eprintln!("{blocked}");
        std::process::exit(2);
    }
    Ok(())
}
