//! The sync executor: one full pass, in strict order:
//!
//! 1. Mirror source → target (rsync). Failure ends the pass.
//! 2. Stage everything, deletions included.
//! 3. Read NUL-separated porcelain status; zero entries ends the pass silently.
//! 4. Commit `Updated {N} files - {tags}` as the synthetic author.
//! 5. Push to the upstream, falling back to the configured remote.
//!
//! Nothing is rolled back: a failing step leaves whatever the earlier steps did.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use backwatch_core::{collect_tags, render_tags, CommitAuthor, TagRules, WatchConfig};

use crate::error::SyncError;
use crate::git::GitRepo;
use crate::mirror::{self, MirrorOptions};
use crate::runner::CommandRunner;

// ---------------------------------------------------------------------------
// Pass result
// ---------------------------------------------------------------------------

/// Where a successful push landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "remote", rename_all = "lowercase")]
pub enum PushTarget {
    Upstream,
    Remote(String),
}

/// The step a failed pass stopped at, with the rendered error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "error", rename_all = "lowercase")]
pub enum PassFailure {
    Mirror(String),
    Git(String),
}

impl fmt::Display for PassFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassFailure::Mirror(err) => write!(f, "mirror: {err}"),
            PassFailure::Git(err) => write!(f, "git: {err}"),
        }
    }
}

/// Outcome of one [`SyncExecutor::sync_once`] call. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
    pub mirrored: bool,
    pub changed: usize,
    pub tags: Vec<String>,
    pub message: Option<String>,
    pub commit: Option<String>,
    pub pushed: bool,
    pub push_target: Option<PushTarget>,
    pub failure: Option<PassFailure>,
}

impl SyncResult {
    /// An empty result for a pass that began at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            mirrored: false,
            changed: 0,
            tags: Vec::new(),
            message: None,
            commit: None,
            pushed: false,
            push_target: None,
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// True when the pass found nothing to commit.
    pub fn is_noop(&self) -> bool {
        self.is_success() && self.changed == 0
    }
}

/// `Updated {count} files - {tag}[, {tag2}...]`
pub fn commit_message(count: usize, tags: &[String]) -> String {
    format!("Updated {count} files - {}", render_tags(tags))
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs passes for one source/target pair. Cheap to share behind an `Arc`.
pub struct SyncExecutor {
    source: PathBuf,
    target: PathBuf,
    mirror: MirrorOptions,
    rules: TagRules,
    author: CommitAuthor,
    fallback_remote: String,
    runner: Arc<dyn CommandRunner>,
}

impl SyncExecutor {
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        config: &WatchConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mirror: MirrorOptions::from_config(config),
            rules: config.rules.clone(),
            author: config.author.clone(),
            fallback_remote: config.fallback_remote.clone(),
            runner,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Run one pass. Never fails: the first error is logged and recorded in
    /// [`SyncResult::failure`].
    pub fn sync_once(&self) -> SyncResult {
        let clock = Instant::now();
        let mut result = SyncResult::new(Utc::now());

        match mirror::mirror(
            self.runner.as_ref(),
            &self.source,
            &self.target,
            &self.mirror,
        ) {
            Ok(()) => {
                result.mirrored = true;
                if let Err(err) = self.commit_and_push(&mut result) {
                    tracing::error!(target: "git", "commit/push failed: {err}");
                    result.failure = Some(PassFailure::Git(err.to_string()));
                }
            }
            Err(err) => {
                tracing::error!(target: "mirror", "rsync failed: {err}");
                result.failure = Some(PassFailure::Mirror(err.to_string()));
            }
        }

        result.duration_ms = clock.elapsed().as_millis();
        result
    }

    fn commit_and_push(&self, result: &mut SyncResult) -> Result<(), SyncError> {
        let repo = GitRepo::new(self.runner.as_ref(), &self.target);

        repo.stage_all()?;
        let changed = repo.status()?;
        result.changed = changed.len();
        if changed.is_empty() {
            tracing::debug!(target: "git", "no changes in {}", self.target.display());
            return Ok(());
        }

        result.tags = collect_tags(&self.rules, changed.iter().map(|entry| &entry.path));
        let message = commit_message(result.changed, &result.tags);
        result.message = Some(message.clone());
        result.commit = Some(repo.commit(&message, &self.author)?);

        result.push_target = Some(self.push(&repo)?);
        result.pushed = true;
        tracing::info!(target: "git", "pushed: {message}");
        Ok(())
    }

    fn push(&self, repo: &GitRepo<'_>) -> Result<PushTarget, SyncError> {
        let upstream_err = match repo.push_upstream() {
            Ok(()) => return Ok(PushTarget::Upstream),
            Err(err) => err,
        };

        if !repo.remotes()?.contains(&self.fallback_remote) {
            return Err(SyncError::NoFallbackRemote {
                remote: self.fallback_remote.clone(),
                upstream_error: upstream_err.to_string(),
            });
        }

        tracing::warn!(
            target: "git",
            "push to upstream failed ({upstream_err}); retrying with '{}'",
            self.fallback_remote
        );
        repo.push_to(&self.fallback_remote)?;
        Ok(PushTarget::Remote(self.fallback_remote.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::runner::fake::{subcommand_of, FakeRunner};
    use crate::runner::CommandOutput;

    struct Script {
        rsync_ok: bool,
        status: &'static str,
        upstream_push_ok: bool,
        remotes: &'static str,
        fallback_push_ok: bool,
    }

    impl Default for Script {
        fn default() -> Self {
            Self {
                rsync_ok: true,
                status: "",
                upstream_push_ok: true,
                remotes: "origin\n",
                fallback_push_ok: true,
            }
        }
    }

    fn scripted(script: Script) -> Arc<FakeRunner> {
        Arc::new(FakeRunner::new(move |program, args| {
            if program == "rsync" {
                return if script.rsync_ok {
                    CommandOutput::ok("")
                } else {
                    CommandOutput::failed(12, "connection unexpectedly closed")
                };
            }
            match subcommand_of(args) {
                Some("status") => CommandOutput::ok(script.status),
                Some("rev-parse") => CommandOutput::ok("0123abcd\n"),
                Some("remote") => CommandOutput::ok(script.remotes),
                Some("push") if args.len() == 2 => {
                    if script.upstream_push_ok {
                        CommandOutput::ok("")
                    } else {
                        CommandOutput::failed(128, "fatal: no upstream configured")
                    }
                }
                Some("push") => {
                    if script.fallback_push_ok {
                        CommandOutput::ok("")
                    } else {
                        CommandOutput::failed(128, "fatal: could not read from remote")
                    }
                }
                _ => CommandOutput::ok(""),
            }
        }))
    }

    fn executor(runner: Arc<FakeRunner>) -> SyncExecutor {
        SyncExecutor::new("/src", "/repo", &WatchConfig::default(), runner)
    }

    #[test]
    fn message_shape_is_exact() {
        let tags = vec!["cron".to_string(), "soul".to_string()];
        assert_eq!(commit_message(2, &tags), "Updated 2 files - cron, soul");
    }

    #[test]
    fn clean_tree_commits_nothing_and_pushes_nothing() {
        let runner = scripted(Script::default());
        let result = executor(runner.clone()).sync_once();

        assert!(result.is_noop());
        assert!(result.mirrored);
        assert_eq!(runner.calls_to("git", "add").len(), 1, "staging is unconditional");
        assert!(runner.calls_to("git", "commit").is_empty());
        assert!(runner.calls_to("git", "push").is_empty());
    }

    #[test]
    fn changes_are_committed_with_tag_summary() {
        let runner = scripted(Script {
            status: "A  workspace/SOUL.md\0A  cron/job1\0",
            ..Script::default()
        });
        let result = executor(runner.clone()).sync_once();

        assert!(result.is_success());
        assert_eq!(result.changed, 2);
        assert_eq!(result.message.as_deref(), Some("Updated 2 files - cron, soul"));
        assert_eq!(result.commit.as_deref(), Some("0123abcd"));
        assert_eq!(result.push_target, Some(PushTarget::Upstream));
        assert!(result.pushed);
    }

    #[test]
    fn staging_precedes_status_query() {
        let runner = scripted(Script::default());
        executor(runner.clone()).sync_once();

        let order: Vec<String> = runner
            .calls()
            .iter()
            .map(|call| match call[0].as_str() {
                "rsync" => "rsync".to_string(),
                _ => subcommand_of(&call[1..]).unwrap_or_default().to_string(),
            })
            .collect();
        assert_eq!(order, vec!["rsync", "add", "status"]);
    }

    #[test]
    fn mirror_failure_skips_git_entirely() {
        let runner = scripted(Script {
            rsync_ok: false,
            status: "A  cron/job1\0",
            ..Script::default()
        });
        let result = executor(runner.clone()).sync_once();

        assert!(!result.mirrored);
        assert!(matches!(result.failure, Some(PassFailure::Mirror(_))));
        assert_eq!(runner.calls().len(), 1, "only rsync ran");
    }

    #[test]
    fn upstream_failure_falls_back_to_origin() {
        let runner = scripted(Script {
            status: " M cron/job1\0",
            upstream_push_ok: false,
            ..Script::default()
        });
        let result = executor(runner.clone()).sync_once();

        assert!(result.is_success());
        assert_eq!(result.push_target, Some(PushTarget::Remote("origin".to_string())));
        let pushes = runner.calls_to("git", "push");
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1][1..], ["push", "--quiet", "origin", "HEAD"]);
    }

    #[test]
    fn upstream_failure_without_origin_is_reported() {
        let runner = scripted(Script {
            status: " M cron/job1\0",
            upstream_push_ok: false,
            remotes: "backup\n",
            ..Script::default()
        });
        let result = executor(runner.clone()).sync_once();

        match &result.failure {
            Some(PassFailure::Git(message)) => {
                assert!(message.contains("no 'origin' remote"), "{message}")
            }
            other => panic!("expected git failure, got {other:?}"),
        }
        assert!(result.commit.is_some(), "commit is not rolled back");
        assert!(!result.pushed);
    }

    #[test]
    fn fallback_push_failure_is_reported() {
        let runner = scripted(Script {
            status: " M cron/job1\0",
            upstream_push_ok: false,
            fallback_push_ok: false,
            ..Script::default()
        });
        let result = executor(runner).sync_once();
        assert!(matches!(result.failure, Some(PassFailure::Git(_))));
        assert!(!result.pushed);
    }

    #[test]
    fn not_a_repository_is_swallowed() {
        let runner = Arc::new(FakeRunner::new(|program, _| {
            if program == "rsync" {
                CommandOutput::ok("")
            } else {
                CommandOutput::failed(128, "fatal: not a git repository")
            }
        }));
        let result = executor(runner).sync_once();
        assert!(result.mirrored);
        assert!(matches!(result.failure, Some(PassFailure::Git(_))));
    }

    #[test]
    fn second_pass_after_commit_is_noop() {
        let committed = Arc::new(AtomicBool::new(false));
        let flag = committed.clone();
        let runner = Arc::new(FakeRunner::new(move |_, args| match subcommand_of(args) {
            Some("status") if !flag.load(Ordering::SeqCst) => {
                CommandOutput::ok("A  workspace/USER.md\0")
            }
            Some("commit") => {
                flag.store(true, Ordering::SeqCst);
                CommandOutput::ok("")
            }
            Some("rev-parse") => CommandOutput::ok("feed\n"),
            _ => CommandOutput::ok(""),
        }));
        let exec = executor(runner.clone());

        assert_eq!(exec.sync_once().changed, 1);
        let second = exec.sync_once();
        assert!(second.is_noop());
        assert_eq!(runner.calls_to("git", "commit").len(), 1);
    }

    #[test]
    fn result_serializes_failure_stage() {
        let runner = scripted(Script {
            rsync_ok: false,
            ..Script::default()
        });
        let result = executor(runner).sync_once();
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["failure"]["stage"], "mirror");
        assert_eq!(json["mirrored"], false);
    }
}
