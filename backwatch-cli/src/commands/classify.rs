//! `backwatch classify`: preview routing-table tags for paths.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use backwatch_core::{classify, collect_tags, render_tags, WatchConfig};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Repository-relative paths.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// YAML config file providing `rules`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ClassifyArgs {
    pub fn run(self) -> Result<()> {
        let config = WatchConfig::load(self.config.as_deref()).context("failed to load config")?;
        for path in &self.paths {
            println!("{path}\t{}", classify(&config.rules, path));
        }
        let tags = collect_tags(&config.rules, &self.paths);
        println!("tags: {}", render_tags(&tags));
        Ok(())
    }
}
