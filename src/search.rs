//! Fuzzy snippet search.
//!
//! The index is rebuilt for every query. Each field is scored by the best
//! approximate substring match of the query (edit distance over query
//! length, 0.0 = exact, 1.0 = no match) and the field scores are combined
//! with per-field weights. Lower scores rank first.

use crate::models::Snippet;

/// Field scores above this are not matches.
pub const SEARCH_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Title,
    Description,
    Content,
    Tags,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Title,
        SearchField::Description,
        SearchField::Content,
        SearchField::Tags,
    ];

    pub fn weight(self) -> f64 {
        match self {
            SearchField::Title => 0.4,
            SearchField::Description => 0.3,
            SearchField::Content => 0.2,
            SearchField::Tags => 0.1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Description => "description",
            SearchField::Content => "content",
            SearchField::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub field: SearchField,
    /// Which tag matched, for the tags field.
    pub value_index: Option<usize>,
    /// Inclusive character ranges of the matched text.
    pub indices: Vec<(usize, usize)>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub snippet: Snippet,
    pub score: f64,
    pub matches: Vec<FieldMatch>,
}

impl SearchResult {
    pub fn matched_fields(&self) -> impl Iterator<Item = SearchField> + '_ {
        self.matches.iter().map(|m| m.field)
    }
}

struct IndexEntry<'a> {
    snippet: &'a Snippet,
    title: Vec<char>,
    description: Vec<char>,
    content: Vec<char>,
    tags: Vec<Vec<char>>,
}

/// Lowercased character view of a snippet collection.
pub struct SearchIndex<'a> {
    entries: Vec<IndexEntry<'a>>,
}

impl<'a> SearchIndex<'a> {
    pub fn build(snippets: &'a [Snippet]) -> Self {
        let entries = snippets
            .iter()
            .map(|snippet| IndexEntry {
                snippet,
                title: fold(&snippet.title),
                description: fold(&snippet.description),
                content: fold(&snippet.content),
                tags: snippet.tags.iter().map(|tag| fold(tag)).collect(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ranked matches for `query`. A blank query matches nothing; callers
    /// show the unfiltered collection instead.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let pattern = fold(query.trim());
        if pattern.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .filter_map(|entry| score_entry(entry, &pattern))
            .collect();

        // stable: equal scores keep collection order
        results.sort_by(|a, b| a.score.total_cmp(&b.score));
        results
    }
}

pub fn search_snippets(snippets: &[Snippet], query: &str) -> Vec<SearchResult> {
    SearchIndex::build(snippets).search(query)
}

fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn score_entry(entry: &IndexEntry<'_>, pattern: &[char]) -> Option<SearchResult> {
    let mut matches = Vec::new();

    for field in SearchField::ALL {
        let found = match field {
            SearchField::Title => field_match(field, None, pattern, &entry.title),
            SearchField::Description => field_match(field, None, pattern, &entry.description),
            SearchField::Content => field_match(field, None, pattern, &entry.content),
            SearchField::Tags => entry
                .tags
                .iter()
                .enumerate()
                .filter_map(|(index, tag)| field_match(field, Some(index), pattern, tag))
                .min_by(|a, b| a.score.total_cmp(&b.score)),
        };
        matches.extend(found);
    }

    if matches.is_empty() {
        return None;
    }

    let score = matches
        .iter()
        .map(|m| m.score.max(f64::EPSILON).powf(m.field.weight()))
        .product();

    Some(SearchResult {
        snippet: entry.snippet.clone(),
        score,
        matches,
    })
}

fn field_match(
    field: SearchField,
    value_index: Option<usize>,
    pattern: &[char],
    text: &[char],
) -> Option<FieldMatch> {
    let window = best_window(pattern, text)?;
    let score = window.distance as f64 / pattern.len() as f64;
    (score <= SEARCH_THRESHOLD).then(|| FieldMatch {
        field,
        value_index,
        indices: vec![(window.start, window.end)],
        score,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    distance: usize,
    start: usize,
    end: usize,
}

#[derive(Clone, Copy)]
struct Cell {
    cost: usize,
    start: usize,
}

/// Lowest edit distance between `pattern` and any substring of `text`,
/// with the span of the earliest such substring.
fn best_window(pattern: &[char], text: &[char]) -> Option<Window> {
    if pattern.is_empty() || text.is_empty() {
        return None;
    }

    let m = pattern.len();
    let mut prev: Vec<Cell> = (0..=m).map(|i| Cell { cost: i, start: 0 }).collect();
    let mut cur = prev.clone();
    let mut best: Option<Window> = None;

    for j in 1..=text.len() {
        // an empty prefix of the pattern matches right after text[j - 1]
        cur[0] = Cell { cost: 0, start: j };
        for i in 1..=m {
            let mismatch = usize::from(pattern[i - 1] != text[j - 1]);
            let diagonal = Cell {
                cost: prev[i - 1].cost + mismatch,
                start: prev[i - 1].start,
            };
            let skip_text = Cell {
                cost: prev[i].cost + 1,
                start: prev[i].start,
            };
            let skip_pattern = Cell {
                cost: cur[i - 1].cost + 1,
                start: cur[i - 1].start,
            };

            cur[i] = [skip_text, skip_pattern]
                .into_iter()
                .fold(diagonal, |acc, cell| if cell.cost < acc.cost { cell } else { acc });
        }

        let candidate = cur[m];
        if best.is_none_or(|b| candidate.cost < b.distance) && candidate.start < j {
            best = Some(Window {
                distance: candidate.cost,
                start: candidate.start,
                end: j - 1,
            });
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}
