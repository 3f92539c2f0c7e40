//! YAML configuration, read once at startup.
//!
//! Lookup order: an explicit `--config` path (must exist), then
//! `<config_dir>/backwatch/config.yaml` when present, then built-in defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::{self, DEFAULT_CHMOD, DEFAULT_DEBOUNCE, DEFAULT_FALLBACK_REMOTE};
use crate::types::{CommitAuthor, TagRules};

/// Daemon and executor settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period after the last change before a pass runs.
    pub debounce_secs: f64,
    /// rsync `--exclude-from` file. A configured but missing file fails every pass.
    pub exclude_from: Option<PathBuf>,
    /// Pass `--chmod` (and `--chown` when known) to rsync.
    pub normalize_permissions: bool,
    pub chmod: String,
    /// `uid:gid` for `--chown`. Falls back to `SUDO_UID`/`SUDO_GID`.
    pub chown: Option<String>,
    pub author: CommitAuthor,
    /// Remote tried when pushing to the branch upstream fails.
    pub fallback_remote: String,
    pub rules: TagRules,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_secs: DEFAULT_DEBOUNCE.as_secs_f64(),
            exclude_from: None,
            normalize_permissions: true,
            chmod: DEFAULT_CHMOD.to_string(),
            chown: None,
            author: CommitAuthor::default(),
            fallback_remote: DEFAULT_FALLBACK_REMOTE.to_string(),
            rules: TagRules::default(),
        }
    }
}

impl WatchConfig {
    /// Load from an explicit path; the file must exist.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config for this run.
    ///
    /// `explicit` must exist when given. Otherwise the per-user file is used if
    /// present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_at(path);
        }
        match paths::default_config_path() {
            Some(path) if path.is_file() => Self::load_at(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_secs <= 0.0 || Duration::try_from_secs_f64(self.debounce_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "debounce_secs must be a positive, representable number of seconds, got {}",
                self.debounce_secs
            )));
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.prefix.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "rule #{index} has an empty prefix"
                )));
            }
            if rule.tag.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "rule #{index} ('{}') has an empty tag",
                    rule.prefix
                )));
            }
        }
        if self.author.name.trim().is_empty() || self.author.email.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "author name and email must be non-empty".to_string(),
            ));
        }
        if self.fallback_remote.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "fallback_remote must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The debounce interval; an unvalidated, unrepresentable value falls back
    /// to the default.
    pub fn debounce(&self) -> Duration {
        Duration::try_from_secs_f64(self.debounce_secs).unwrap_or(DEFAULT_DEBOUNCE)
    }

    /// `--chown` value: the configured one, else the invoking user behind `sudo`.
    pub fn resolved_chown(&self) -> Option<String> {
        self.resolved_chown_with(|key| std::env::var(key).ok())
    }

    pub fn resolved_chown_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(chown) = &self.chown {
            return Some(chown.clone());
        }
        match (env("SUDO_UID"), env("SUDO_GID")) {
            (Some(uid), Some(gid)) if !uid.is_empty() && !gid.is_empty() => {
                Some(format!("{uid}:{gid}"))
            }
            _ => None,
        }
    }
}
