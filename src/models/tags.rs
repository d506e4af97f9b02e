use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::id::EntityId;

/// Represents a tag entry in the tag collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Unique identifier for the tag
    pub id: EntityId,

    /// Name of the tag (without the # prefix)
    pub name: String,

    /// Display color, usually a CSS hex value
    #[serde(default)]
    pub color: String,

    /// Cached number of snippets carrying the tag
    #[serde(default)]
    pub snippet_count: usize,
}

impl Tag {
    /// Creates a new tag with the given name
    pub fn new(name: &str, color: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: clean_tag(name).to_string(),
            color: color.into(),
            snippet_count: 0,
        }
    }

    /// Returns the tag with a # prefix for display
    pub fn display_name(&self) -> String {
        format!("#{}", self.name)
    }
}

/// Legacy category entry. Categories predate languages and are kept so older
/// exports import cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub snippet_count: usize,
}

/// Legacy flat project label, superseded by [`crate::models::ProjectItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub snippet_count: usize,
}

/// Strip a leading `#` and surrounding whitespace.
pub fn clean_tag(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix('#').unwrap_or(trimmed).trim()
}

/// Tags behave as a set: blanks are dropped and case-insensitive duplicates
/// collapse onto the first spelling seen.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(|tag| {
            let clean = clean_tag(tag.as_ref());
            if clean.is_empty() || !seen.insert(clean.to_lowercase()) {
                return None;
            }
            Some(clean.to_string())
        })
        .collect()
}

/// Split a comma separated tag list as typed by a user.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    normalize_tags(input.split(','))
}
