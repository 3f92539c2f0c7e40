//! Error types for backwatch-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise inside a synchronization pass or path validation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external tool could not be started at all.
    #[error("failed to run {program}: {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Configured exclude-pattern file is absent.
    #[error("exclude file not found: {path}")]
    ExcludeFileMissing { path: PathBuf },

    /// rsync exited non-zero.
    #[error("rsync exited with {status}: {stderr}")]
    Mirror { status: String, stderr: String },

    /// A git subcommand exited non-zero.
    #[error("git {subcommand} exited with {status}: {stderr}")]
    Git {
        subcommand: String,
        status: String,
        stderr: String,
    },

    /// Push to the upstream failed and the fallback remote is not configured.
    #[error("push to upstream failed and no '{remote}' remote is configured: {upstream_error}")]
    NoFallbackRemote {
        remote: String,
        upstream_error: String,
    },

    #[error("{role} path is not a directory: {path}")]
    NotADirectory { role: &'static str, path: PathBuf },

    #[error("target is not a git repository: {path}")]
    NotARepository { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
