//! End-to-end passes against real `rsync` and `git`. Skipped when either tool
//! is missing from PATH.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use backwatch_core::WatchConfig;
use backwatch_sync::{validate_paths, PassFailure, PushTarget, SyncExecutor, SystemRunner};
use tempfile::TempDir;

fn tools_available() -> bool {
    let ok = ["rsync", "git"].iter().all(|tool| {
        Command::new(tool)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    });
    if !ok {
        eprintln!("skipping: rsync and git are required");
    }
    ok
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {args:?}: {e}"));
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Target repo with one commit on `main` tracking a bare `origin`.
struct Fixture {
    _root: TempDir,
    source: std::path::PathBuf,
    target: std::path::PathBuf,
    remote: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = TempDir::new().expect("tempdir");
        let source = root.path().join("source");
        let target = root.path().join("target");
        let remote = root.path().join("remote.git");
        fs::create_dir_all(&source).expect("mkdir source");
        fs::create_dir_all(&target).expect("mkdir target");

        git(root.path(), &["init", "--quiet", "--bare", "remote.git"]);
        git(&target, &["init", "--quiet"]);
        git(&target, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&target, &["config", "user.email", "fixture@example.com"]);
        git(&target, &["config", "user.name", "fixture"]);
        git(&target, &["config", "commit.gpgsign", "false"]);
        fs::write(target.join(".keep"), "").expect("write .keep");
        git(&target, &["add", "-A"]);
        git(&target, &["commit", "--quiet", "-m", "initial"]);
        git(
            &target,
            &["remote", "add", "origin", remote.to_str().expect("utf8 path")],
        );
        git(&target, &["push", "--quiet", "-u", "origin", "main"]);

        // The baseline commit holds `.keep`; mirror it so --delete leaves it alone.
        fs::write(source.join(".keep"), "").expect("write source .keep");

        Self {
            _root: root,
            source,
            target,
            remote,
        }
    }

    fn executor(&self) -> SyncExecutor {
        let config = WatchConfig {
            normalize_permissions: false,
            ..WatchConfig::default()
        };
        SyncExecutor::new(&self.source, &self.target, &config, Arc::new(SystemRunner))
    }

    fn commit_count(&self) -> usize {
        git(&self.target, &["rev-list", "--count", "HEAD"])
            .parse()
            .expect("count")
    }
}

#[test]
fn soul_and_cron_commit_message() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    validate_paths(&SystemRunner, &fx.source, &fx.target).expect("valid paths");

    fs::create_dir_all(fx.source.join("workspace")).expect("mkdir");
    fs::create_dir_all(fx.source.join("cron")).expect("mkdir");
    fs::write(fx.source.join("workspace/SOUL.md"), "be kind\n").expect("write");
    fs::write(fx.source.join("cron/job1"), "0 * * * *\n").expect("write");

    let result = fx.executor().sync_once();
    assert!(result.is_success(), "{:?}", result.failure);
    assert_eq!(result.message.as_deref(), Some("Updated 2 files - cron, soul"));
    assert_eq!(result.push_target, Some(PushTarget::Upstream));

    let subject = git(&fx.target, &["log", "-1", "--format=%s"]);
    assert_eq!(subject, "Updated 2 files - cron, soul");
    let author = git(&fx.target, &["log", "-1", "--format=%an <%ae> / %cn"]);
    assert_eq!(author, "backwatch <backwatch@localhost> / backwatch");

    let remote_head = git(&fx.remote, &["rev-parse", "main"]);
    assert_eq!(Some(remote_head), result.commit);
}

#[test]
fn second_pass_without_changes_is_noop() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    fs::create_dir_all(fx.source.join("cron")).expect("mkdir");
    fs::write(fx.source.join("cron/job1"), "x").expect("write");

    let exec = fx.executor();
    let first = exec.sync_once();
    assert_eq!(first.changed, 1);
    let commits = fx.commit_count();

    let second = exec.sync_once();
    assert!(second.is_noop());
    assert_eq!(fx.commit_count(), commits, "no new commit object");
}

#[test]
fn deletions_in_source_are_committed() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    fs::write(fx.source.join("notes.txt"), "draft").expect("write");
    let exec = fx.executor();
    assert_eq!(exec.sync_once().changed, 1);

    fs::remove_file(fx.source.join("notes.txt")).expect("remove");
    let result = exec.sync_once();
    assert_eq!(result.message.as_deref(), Some("Updated 1 files - misc"));
    assert!(!fx.target.join("notes.txt").exists());
    assert!(fx.target.join(".git").is_dir(), "metadata dir survives --delete");
}

#[test]
fn missing_upstream_falls_back_to_origin() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    git(&fx.target, &["branch", "--quiet", "--unset-upstream"]);
    fs::write(fx.source.join("a.txt"), "a").expect("write");

    let result = fx.executor().sync_once();
    assert!(result.is_success(), "{:?}", result.failure);
    assert_eq!(result.push_target, Some(PushTarget::Remote("origin".to_string())));
}

#[test]
fn missing_exclude_file_fails_the_pass() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    fs::write(fx.source.join("a.txt"), "a").expect("write");
    let config = WatchConfig {
        normalize_permissions: false,
        exclude_from: Some(fx.source.join("no-such.exclude")),
        ..WatchConfig::default()
    };
    let exec = SyncExecutor::new(&fx.source, &fx.target, &config, Arc::new(SystemRunner));

    let result = exec.sync_once();
    assert!(matches!(result.failure, Some(PassFailure::Mirror(_))));
    assert!(!fx.target.join("a.txt").exists());
}

#[test]
fn exclude_file_patterns_are_honoured() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    let exclude = fx.target.parent().expect("root").join("excludes");
    fs::write(&exclude, "*.log\n").expect("write excludes");
    fs::write(fx.source.join("keep.md"), "k").expect("write");
    fs::write(fx.source.join("skip.log"), "s").expect("write");

    let config = WatchConfig {
        normalize_permissions: false,
        exclude_from: Some(exclude),
        ..WatchConfig::default()
    };
    let result = SyncExecutor::new(&fx.source, &fx.target, &config, Arc::new(SystemRunner))
        .sync_once();
    assert!(result.is_success(), "{:?}", result.failure);
    assert_eq!(result.changed, 1);
    assert!(!fx.target.join("skip.log").exists());
}

#[test]
fn names_with_spaces_and_arrows_keep_their_tag() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    fs::create_dir_all(fx.source.join("cron")).expect("mkdir");
    fs::write(fx.source.join("cron/daily -> weekly"), "0 0 * * *\n").expect("write");

    let result = fx.executor().sync_once();
    assert!(result.is_success(), "{:?}", result.failure);
    assert_eq!(result.message.as_deref(), Some("Updated 1 files - cron"));
}

#[test]
fn staged_rename_counts_once_under_the_destination() {
    if !tools_available() {
        return;
    }
    let fx = Fixture::new();
    fs::create_dir_all(fx.source.join("cron")).expect("mkdir");
    fs::write(fx.source.join("cron/job1"), "0 * * * * backup --all\n").expect("write");
    let exec = fx.executor();
    assert_eq!(exec.sync_once().changed, 1);

    fs::create_dir_all(fx.source.join("agents")).expect("mkdir");
    fs::rename(fx.source.join("cron/job1"), fx.source.join("agents/job1")).expect("rename");
    let result = exec.sync_once();
    assert!(result.is_success(), "{:?}", result.failure);
    assert_eq!(result.message.as_deref(), Some("Updated 1 files - agents"));
}
