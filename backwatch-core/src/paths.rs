use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the repository metadata directory, excluded from mirroring and
/// ignored by the watcher.
pub const GIT_METADATA_DIR: &str = ".git";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);
pub const DEFAULT_FALLBACK_REMOTE: &str = "origin";
pub const DEFAULT_CHMOD: &str = "D755,F644";

pub const CONFIG_DIR_NAME: &str = "backwatch";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

pub fn config_path(config_root: &Path) -> PathBuf {
    config_root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// `<config_dir>/backwatch/config.yaml` for the current user, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|root| config_path(&root))
}

/// True when any component of `path` is the repository metadata directory.
pub fn has_git_component(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str() == std::ffi::OsStr::new(GIT_METADATA_DIR))
}
