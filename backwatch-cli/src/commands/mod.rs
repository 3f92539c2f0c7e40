pub mod classify;
pub mod sync;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use backwatch_core::WatchConfig;

/// Config flags shared by `watch` and `sync`.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// YAML config file (default: <config dir>/backwatch/config.yaml if present).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// rsync exclude-pattern file; overrides `exclude_from` in the config.
    #[arg(long, value_name = "PATH")]
    pub exclude_from: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<WatchConfig> {
        let mut config = WatchConfig::load(self.config.as_deref()).context("failed to load config")?;
        if let Some(exclude_from) = &self.exclude_from {
            config.exclude_from = Some(exclude_from.clone());
        }
        Ok(config)
    }
}
