//! Domain types shared by the executor and the daemon.
//!
//! The routing table is an ordered list, never a map: the first rule whose
//! prefix matches wins, so authoring order decides between overlapping prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Routing table
// ---------------------------------------------------------------------------

/// One routing entry: paths starting with `prefix` are labelled `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    pub prefix: String,
    pub tag: String,
}

impl TagRule {
    pub fn new(prefix: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tag: tag.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Ordered routing table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagRules(Vec<TagRule>);

impl TagRules {
    pub fn new(rules: Vec<TagRule>) -> Self {
        Self(rules)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TagRule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TagRules {
    /// Built-in table for an agent home directory (workspace notes, cron jobs,
    /// agent state). Specific files come before the directories that contain them.
    fn default() -> Self {
        let rules = [
            ("workspace/SOUL.md", "soul"),
            ("workspace/IDENTITY.md", "identity"),
            ("workspace/USER.md", "user"),
            ("workspace/MEMORY.md", "memory"),
            ("workspace/memory/", "memory"),
            ("workspace/AGENTS.md", "agents"),
            ("workspace/TOOLS.md", "tools"),
            ("workspace/HEARTBEAT.md", "heartbeat"),
            ("workspace/skills/", "skills"),
            ("workspace/", "workspace"),
            ("cron/", "cron"),
            ("agents/", "agents"),
            ("credentials/", "credentials"),
            ("devices/", "devices"),
            ("identity/", "identity"),
        ];
        Self(
            rules
                .into_iter()
                .map(|(prefix, tag)| TagRule::new(prefix, tag))
                .collect(),
        )
    }
}

impl From<Vec<TagRule>> for TagRules {
    fn from(rules: Vec<TagRule>) -> Self {
        Self(rules)
    }
}

impl<'a> IntoIterator for &'a TagRules {
    type Item = &'a TagRule;
    type IntoIter = std::slice::Iter<'a, TagRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Commit identity
// ---------------------------------------------------------------------------

/// Synthetic author/committer stamped on every automated commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "backwatch".to_string(),
            email: "backwatch@localhost".to_string(),
        }
    }
}

impl fmt::Display for CommitAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
