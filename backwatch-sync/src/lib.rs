//! # backwatch-sync
//!
//! One synchronization pass: mirror the source tree into the target
//! repository, then stage, classify, commit and push whatever changed.
//!
//! External tools (`rsync`, `git`) are reached only through [`CommandRunner`],
//! so tests can script their output.

pub mod error;
pub mod executor;
pub mod git;
pub mod mirror;
pub mod runner;
pub mod validate;

pub use error::SyncError;
pub use executor::{commit_message, PassFailure, PushTarget, SyncExecutor, SyncResult};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use validate::validate_paths;
