//! `backwatch watch`: the long-running daemon.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use backwatch_daemon::{start_blocking, DaemonOptions};

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Directory to mirror.
    pub source: PathBuf,

    /// Git repository that receives the mirror.
    pub target: PathBuf,

    /// Seconds of quiet required after the last change before a sync.
    #[arg(long, value_name = "SECONDS")]
    pub debounce: Option<f64>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let mut config = self.config.load()?;
        match self.debounce {
            Some(debounce) => {
                config.debounce_secs = debounce;
                config
                    .validate()
                    .with_context(|| format!("invalid configuration with --debounce {debounce}"))?;
            }
            None => config.validate().context("invalid configuration")?,
        }

        start_blocking(
            DaemonOptions {
                source: self.source,
                target: self.target,
                config,
            },
            self.log_json,
        )
        .context("watcher exited with error")
    }
}
