//! Backwatch daemon: debounce scheduler, filesystem watcher, and the
//! controller that ties them to the sync executor.

mod error;
mod runtime;
pub mod scheduler;
pub mod watch;

pub use error::DaemonError;
pub use runtime::{
    init_tracing, run, run_with, shutdown_signal, start_blocking, DaemonOptions, SHUTDOWN_GRACE,
};
pub use scheduler::{
    DebounceScheduler, DebounceState, Phase, SchedulerEvent, SchedulerHandle, SyncPass,
    TriggerDecision,
};
