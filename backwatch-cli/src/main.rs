//! Backwatch: mirror a directory into a git repository and commit every change.
//!
//! # Usage
//!
//! ```text
//! backwatch watch <source> <target-repo> [--debounce SECS] [--config PATH] [--exclude-from PATH] [--log-json]
//! backwatch sync <source> <target-repo> [--config PATH] [--exclude-from PATH] [--json]
//! backwatch classify <path>... [--config PATH]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{classify::ClassifyArgs, sync::SyncArgs, watch::WatchArgs};

#[derive(Parser, Debug)]
#[command(
    name = "backwatch",
    version,
    about = "Mirror a directory into a git repository and push every change",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch a source tree and sync it into a repository after each quiet period.
    Watch(WatchArgs),

    /// Run a single sync pass and exit.
    Sync(SyncArgs),

    /// Show which tag each path would get in a commit message.
    Classify(ClassifyArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Watch(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Classify(args) => args.run(),
    }
}
