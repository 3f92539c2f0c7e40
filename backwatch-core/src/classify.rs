//! Change classification: path → tag, and changed paths → commit tag list.

use std::collections::BTreeSet;

use crate::types::TagRules;

/// Tag for paths no rule claims.
pub const MISC_TAG: &str = "misc";

/// Tag used when a non-empty change set yields no tags at all.
pub const UNKNOWN_TAG: &str = "unknown";

/// Return the tag of the first rule whose prefix starts `path`, or [`MISC_TAG`].
pub fn classify<'a>(rules: &'a TagRules, path: &str) -> &'a str {
    rules
        .iter()
        .find(|rule| rule.matches(path))
        .map(|rule| rule.tag.as_str())
        .unwrap_or(MISC_TAG)
}

/// Distinct tags across `paths`, rendered for a commit message.
///
/// Sorted ascending with [`MISC_TAG`] moved to the end. An empty input gives
/// an empty list.
pub fn collect_tags<I, S>(rules: &TagRules, paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut any_path = false;
    let mut tags = BTreeSet::new();
    for path in paths {
        any_path = true;
        tags.insert(classify(rules, path.as_ref()).to_string());
    }
    if any_path && tags.is_empty() {
        tags.insert(UNKNOWN_TAG.to_string());
    }
    order_tags(tags)
}

fn order_tags(tags: BTreeSet<String>) -> Vec<String> {
    let (misc, mut ordered): (Vec<String>, Vec<String>) =
        tags.into_iter().partition(|tag| tag == MISC_TAG);
    ordered.extend(misc);
    ordered
}

/// Comma-space join used in commit messages.
pub fn render_tags(tags: &[String]) -> String {
    tags.join(", ")
}
