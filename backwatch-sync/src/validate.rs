//! Startup checks: both paths are directories and the target is the root of
//! a git work tree.

use std::fs;
use std::path::Path;

use crate::error::{io_err, SyncError};
use crate::git::GitRepo;
use crate::runner::CommandRunner;

pub fn validate_paths(
    runner: &dyn CommandRunner,
    source: &Path,
    target: &Path,
) -> Result<(), SyncError> {
    if !source.is_dir() {
        return Err(SyncError::NotADirectory {
            role: "source",
            path: source.to_path_buf(),
        });
    }
    if !target.is_dir() {
        return Err(SyncError::NotADirectory {
            role: "target",
            path: target.to_path_buf(),
        });
    }

    let not_a_repo = || SyncError::NotARepository {
        path: target.to_path_buf(),
    };
    let toplevel = GitRepo::new(runner, target)
        .toplevel()?
        .ok_or_else(not_a_repo)?;

    let target = fs::canonicalize(target).map_err(|e| io_err(target, e))?;
    let toplevel = fs::canonicalize(&toplevel).map_err(|e| io_err(&toplevel, e))?;
    if toplevel != target {
        return Err(not_a_repo());
    }
    Ok(())
}
