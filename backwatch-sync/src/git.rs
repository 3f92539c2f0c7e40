//! Version-control collaborator: the handful of `git` invocations a pass needs.

use std::path::{Path, PathBuf};

use backwatch_core::CommitAuthor;

use crate::error::SyncError;
use crate::runner::{CommandOutput, CommandRunner};

pub const GIT: &str = "git";

/// One `git status --porcelain -z` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// The two-letter `XY` code.
    pub status: String,
    /// Repository-relative path; the destination for renames and copies.
    pub path: String,
}

impl StatusEntry {
    fn is_rename_or_copy(&self) -> bool {
        self.status.chars().any(|c| c == 'R' || c == 'C')
    }
}

/// Parse NUL-separated porcelain v1 output.
///
/// Paths are verbatim (no quoting). A rename or copy is `XY dest` followed by
/// a separate record holding the source path, which is skipped.
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut records = output.split('\0').filter(|record| !record.is_empty());
    while let Some(record) = records.next() {
        let Some(entry) = parse_status_record(record) else {
            continue;
        };
        if entry.is_rename_or_copy() {
            records.next();
        }
        entries.push(entry);
    }
    entries
}

fn parse_status_record(record: &str) -> Option<StatusEntry> {
    let status = record.get(..2)?.to_string();
    let path = record.get(3..).filter(|p| !p.is_empty())?;
    Some(StatusEntry {
        status,
        path: path.to_string(),
    })
}

/// A working tree driven through the `git` CLI.
pub struct GitRepo<'a> {
    runner: &'a dyn CommandRunner,
    workdir: PathBuf,
}

impl<'a> GitRepo<'a> {
    pub fn new(runner: &'a dyn CommandRunner, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn raw(&self, args: &[&str]) -> Result<CommandOutput, SyncError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(GIT, &args, Some(&self.workdir))
    }

    fn git(&self, subcommand: &str, args: &[&str]) -> Result<CommandOutput, SyncError> {
        let output = self.raw(args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(SyncError::Git {
                subcommand: subcommand.to_string(),
                status: output.status_label(),
                stderr: output.stderr,
            })
        }
    }

    /// Top-level directory of the enclosing work tree, if any.
    pub fn toplevel(&self) -> Result<Option<PathBuf>, SyncError> {
        let output = self.raw(&["rev-parse", "--show-toplevel"])?;
        if !output.success() {
            return Ok(None);
        }
        let top = output.stdout.trim();
        Ok((!top.is_empty()).then(|| PathBuf::from(top)))
    }

    /// `git add -A`: stage everything, deletions included.
    pub fn stage_all(&self) -> Result<(), SyncError> {
        self.git("add", &["add", "-A"]).map(|_| ())
    }

    pub fn status(&self) -> Result<Vec<StatusEntry>, SyncError> {
        let output = self.git("status", &["status", "--porcelain", "-z"])?;
        Ok(parse_porcelain(&output.stdout))
    }

    /// Commit the index as `author` (author and committer) and return the new HEAD.
    pub fn commit(&self, message: &str, author: &CommitAuthor) -> Result<String, SyncError> {
        let name = format!("user.name={}", author.name);
        let email = format!("user.email={}", author.email);
        let author_arg = format!("--author={author}");
        self.git(
            "commit",
            &[
                "-c",
                &name,
                "-c",
                &email,
                "-c",
                "commit.gpgsign=false",
                "commit",
                "--quiet",
                &author_arg,
                "-m",
                message,
            ],
        )?;
        let head = self.git("rev-parse", &["rev-parse", "HEAD"])?;
        Ok(head.stdout.trim().to_string())
    }

    /// Push the current branch to its configured upstream.
    pub fn push_upstream(&self) -> Result<(), SyncError> {
        self.git("push", &["push", "--quiet"]).map(|_| ())
    }

    /// Push the current branch to a named remote.
    pub fn push_to(&self, remote: &str) -> Result<(), SyncError> {
        self.git("push", &["push", "--quiet", remote, "HEAD"])
            .map(|_| ())
    }

    pub fn remotes(&self) -> Result<Vec<String>, SyncError> {
        let output = self.git("remote", &["remote"])?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }
}
