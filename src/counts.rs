use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::{EntityId, Snippet};

/// Window for "recently modified", inclusive at the lower bound.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Derived statistics over the snippet collection. Always computed from
/// scratch; nothing here is cached between calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetCounts {
    pub total_snippets: usize,
    pub category_counts: BTreeMap<String, usize>,
    pub folder_counts: BTreeMap<EntityId, usize>,
    pub project_item_counts: BTreeMap<EntityId, usize>,
    pub tag_counts: BTreeMap<String, usize>,
    pub language_counts: BTreeMap<String, usize>,
    pub untagged: usize,
    pub uncategorized: usize,
    pub recently_modified: usize,
    pub favorites: usize,
    pub unassigned: usize,
    pub most_used: usize,
}

impl SnippetCounts {
    pub fn compute(snippets: &[Snippet]) -> Self {
        Self::compute_at(snippets, Utc::now())
    }

    pub fn compute_at(snippets: &[Snippet], now: DateTime<Utc>) -> Self {
        let recent_cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let mut counts = Self {
            total_snippets: snippets.len(),
            ..Self::default()
        };

        for snippet in snippets {
            // a whitespace-only category is both counted and uncategorized
            if !snippet.category.is_empty() {
                *counts.category_counts.entry(snippet.category.clone()).or_default() += 1;
            }
            if snippet.category.trim().is_empty() {
                counts.uncategorized += 1;
            }

            if let Some(folder) = &snippet.folder_id {
                *counts.folder_counts.entry(folder.clone()).or_default() += 1;
            }
            if let Some(project) = &snippet.project_id {
                *counts.project_item_counts.entry(project.clone()).or_default() += 1;
            }

            if snippet.tags.is_empty() {
                counts.untagged += 1;
            }
            for tag in &snippet.tags {
                *counts.tag_counts.entry(tag.clone()).or_default() += 1;
            }

            let language = snippet.language.id();
            if !language.is_empty() {
                *counts.language_counts.entry(language.to_string()).or_default() += 1;
            }

            if snippet.updated_at >= recent_cutoff {
                counts.recently_modified += 1;
            }
            if snippet.favorite {
                counts.favorites += 1;
            }
            if snippet.is_unassigned() {
                counts.unassigned += 1;
            }
            if snippet.usage_count > 0 {
                counts.most_used += 1;
            }
        }

        counts
    }
}
