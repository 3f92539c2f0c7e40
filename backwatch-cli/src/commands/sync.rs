//! `backwatch sync`: one validated, non-debounced pass.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use backwatch_sync::{validate_paths, PushTarget, SyncExecutor, SyncResult, SystemRunner};

use super::ConfigArgs;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Directory to mirror.
    pub source: PathBuf,

    /// Git repository that receives the mirror.
    pub target: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the pass result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        backwatch_daemon::init_tracing(false);
        let config = self.config.load()?;
        validate_paths(&SystemRunner, &self.source, &self.target)
            .context("cannot sync these paths")?;

        let executor = SyncExecutor::new(
            &self.source,
            &self.target,
            &config,
            Arc::new(SystemRunner),
        );
        let result = executor.sync_once();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("failed to render result JSON")?
            );
        } else {
            print_result(&result);
        }

        if let Some(failure) = &result.failure {
            bail!("sync pass failed: {failure}");
        }
        Ok(())
    }
}

fn print_result(result: &SyncResult) {
    if result.failure.is_some() {
        return;
    }
    match &result.message {
        None => println!("✓ nothing to commit"),
        Some(message) => {
            let pushed_to = match &result.push_target {
                Some(PushTarget::Upstream) => "upstream".to_string(),
                Some(PushTarget::Remote(remote)) => remote.clone(),
                None => "nowhere".to_string(),
            };
            println!(
                "✓ {message} ({} → {pushed_to})",
                result.commit.as_deref().unwrap_or("?")
            );
        }
    }
}
