//! Filesystem notification plumbing: a recursive notify watcher feeding an
//! unbounded channel, plus the filters applied before the scheduler sees a path.

use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use backwatch_core::paths::has_git_component;

use crate::error::DaemonError;

/// Start watching `root` recursively; raw events go to `event_tx`.
///
/// Dropping the returned watcher stops it.
pub fn watch_tree(
    root: &Path,
    event_tx: mpsc::UnboundedSender<notify::Result<Event>>,
) -> Result<RecommendedWatcher, DaemonError> {
    let mut watcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Everything except pure reads. Reads would let the mirror, which reads the
/// whole source tree, retrigger itself.
pub fn is_relevant_event_kind(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

/// Drop paths inside a `.git` directory below `root`.
pub fn should_forward(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    !has_git_component(relative)
}

/// Paths from one raw event that should reach the scheduler.
///
/// An event the backend could not attribute to paths (queue overflow, which
/// notify flags for rescan) stands for the whole tree and yields `root`.
pub fn forwarded_paths(root: &Path, event: Event) -> Vec<PathBuf> {
    if event.need_rescan() {
        return vec![root.to_path_buf()];
    }
    if !is_relevant_event_kind(&event.kind) {
        return Vec::new();
    }
    if event.paths.is_empty() {
        return vec![root.to_path_buf()];
    }
    event
        .paths
        .into_iter()
        .filter(|path| should_forward(root, path))
        .collect()
}
