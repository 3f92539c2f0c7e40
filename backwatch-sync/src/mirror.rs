//! Mirror collaborator: replicate the source tree into the target with rsync.
//!
//! Contents of `source` become contents of `target` (trailing-slash form),
//! orphans in the target are deleted, and the target's `.git` is never touched.

use std::path::{Path, PathBuf};

use backwatch_core::paths::GIT_METADATA_DIR;
use backwatch_core::WatchConfig;

use crate::error::SyncError;
use crate::runner::CommandRunner;

pub const RSYNC: &str = "rsync";

/// Optional knobs on top of the fixed mirror contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorOptions {
    pub exclude_from: Option<PathBuf>,
    /// `--chmod` value, e.g. `D755,F644`.
    pub chmod: Option<String>,
    /// `--chown` value, `uid:gid`.
    pub chown: Option<String>,
}

impl MirrorOptions {
    pub fn from_config(config: &WatchConfig) -> Self {
        let (chmod, chown) = if config.normalize_permissions {
            (Some(config.chmod.clone()), config.resolved_chown())
        } else {
            (None, None)
        };
        Self {
            exclude_from: config.exclude_from.clone(),
            chmod,
            chown,
        }
    }
}

/// Full rsync argument vector for one mirror run.
pub fn rsync_args(source: &Path, target: &Path, options: &MirrorOptions) -> Vec<String> {
    let mut args = vec![
        "-a".to_string(),
        "--delete".to_string(),
        "--exclude".to_string(),
        format!("{GIT_METADATA_DIR}/"),
        "--exclude".to_string(),
        GIT_METADATA_DIR.to_string(),
    ];
    if let Some(exclude_from) = &options.exclude_from {
        args.push(format!("--exclude-from={}", exclude_from.display()));
    }
    if let Some(chown) = &options.chown {
        args.push(format!("--chown={chown}"));
    }
    if let Some(chmod) = &options.chmod {
        args.push(format!("--chmod={chmod}"));
    }
    args.push(with_trailing_slash(source));
    args.push(with_trailing_slash(target));
    args
}

fn with_trailing_slash(path: &Path) -> String {
    let mut s = path.display().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}

/// Run the mirror. Any non-zero exit fails the whole pass.
pub fn mirror(
    runner: &dyn CommandRunner,
    source: &Path,
    target: &Path,
    options: &MirrorOptions,
) -> Result<(), SyncError> {
    if let Some(exclude_from) = &options.exclude_from {
        if !exclude_from.is_file() {
            return Err(SyncError::ExcludeFileMissing {
                path: exclude_from.clone(),
            });
        }
    }

    let args = rsync_args(source, target, options);
    let output = runner.run(RSYNC, &args, None)?;
    if !output.success() {
        return Err(SyncError::Mirror {
            status: output.status_label(),
            stderr: output.stderr,
        });
    }
    Ok(())
}
