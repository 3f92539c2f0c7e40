use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::Event;
use tokio::sync::mpsc;

use backwatch_core::WatchConfig;
use backwatch_sync::{validate_paths, CommandRunner, SyncExecutor, SystemRunner};

use crate::error::{io_err, DaemonError};
use crate::scheduler::DebounceScheduler;
use crate::watch::{forwarded_paths, watch_tree};

/// How long process exit waits for a pass still running on the blocking pool.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// What to watch, where to mirror it, and how.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub source: PathBuf,
    pub target: PathBuf,
    pub config: WatchConfig,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(options: DaemonOptions, log_json: bool) -> Result<(), DaemonError> {
    init_tracing(log_json);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let result = runtime.block_on(run(options));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Run the daemon until ctrl-c or SIGTERM.
pub async fn run(options: DaemonOptions) -> Result<(), DaemonError> {
    run_with(options, Arc::new(SystemRunner), shutdown_signal()).await
}

/// Run the daemon with an explicit tool runner until `shutdown` resolves.
///
/// 1. Validate paths (fatal on failure).
/// 2. One immediate, non-debounced pass.
/// 3. Watch the source recursively, feeding the debounce scheduler.
pub async fn run_with(
    options: DaemonOptions,
    runner: Arc<dyn CommandRunner>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), DaemonError> {
    let DaemonOptions {
        source,
        target,
        config,
    } = options;

    {
        let runner = runner.clone();
        let (source, target) = (source.clone(), target.clone());
        tokio::task::spawn_blocking(move || validate_paths(runner.as_ref(), &source, &target))
            .await
            .map_err(|err| DaemonError::Join {
                task: "validate",
                message: err.to_string(),
            })??;
    }

    // Canonicalize so that FSEvents paths (which arrive as real paths, e.g.
    // /private/var/... on macOS) match the `strip_prefix` in the .git filter.
    let root = fs::canonicalize(&source).map_err(|e| io_err(&source, e))?;

    let executor = Arc::new(SyncExecutor::new(
        root.clone(),
        target.clone(),
        &config,
        runner,
    ));

    tracing::info!(target: "watcher", "initial sync: {} -> {}", source.display(), target.display());
    {
        let executor = executor.clone();
        tokio::task::spawn_blocking(move || executor.sync_once())
            .await
            .map_err(|err| DaemonError::Join {
                task: "initial sync",
                message: err.to_string(),
            })?;
    }

    let scheduler = DebounceScheduler::spawn(config.debounce(), executor);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let watcher = watch_tree(&root, event_tx)?;
    tracing::info!(
        target: "watcher",
        "watching: {} (debounce={}s)",
        source.display(),
        config.debounce_secs
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(target: "watcher", "stopping...");
                break;
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(target: "watcher", error = %err, "watcher event error");
                        continue;
                    }
                };
                if event.need_rescan() {
                    tracing::warn!(target: "watcher", "event queue overflowed, treating the whole tree as changed");
                }
                for path in forwarded_paths(&root, event) {
                    scheduler.notify(path)?;
                }
            }
        }
    }

    drop(watcher);
    scheduler.shutdown().await
}

/// Resolves on ctrl-c, or on SIGTERM where available.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "watcher", error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(target: "watcher", error = %err, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(target: "watcher", "received ctrl-c"),
        _ = terminate => tracing::info!(target: "watcher", "received SIGTERM"),
    }
}

/// Stderr subscriber, `RUST_LOG`-filtered (default `info`), targets shown as
/// the subsystem prefix. Also captures `log` records from the sync crate.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
