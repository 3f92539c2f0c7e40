//! Backwatch core library: routing table, change classification, configuration.
//!
//! - [`types`]: tag rules and the commit identity
//! - [`classify`]: first-match path classification and tag aggregation
//! - [`config`]: YAML configuration, loaded once at startup
//! - [`error`]: [`ConfigError`]

pub mod classify;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use classify::{classify, collect_tags, render_tags, MISC_TAG, UNKNOWN_TAG};
pub use config::WatchConfig;
pub use error::ConfigError;
pub use types::{CommitAuthor, TagRule, TagRules};
