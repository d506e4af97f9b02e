use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::storage::StorageData;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import data is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("import data must be a JSON object")]
    NotAnObject,

    #[error("import data has no `snippets` array")]
    MissingSnippets,
}

/// A validated export document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDocument {
    pub data: StorageData,
    /// Entries dropped because they could not be read.
    pub skipped: usize,
}

/// Serialize every collection as one pretty-printed document.
pub fn export_json(data: &StorageData) -> serde_json::Result<String> {
    serde_json::to_string_pretty(data)
}

/// Validate an export document. Only a `snippets` array is required; every
/// other collection falls back to empty when absent or not an array.
/// Unreadable entries are dropped one by one, so a single bad record never
/// takes its whole collection with it.
pub fn parse_import(json: &str) -> Result<ImportDocument, ImportError> {
    let value: Value = serde_json::from_str(json).map_err(ImportError::InvalidJson)?;
    let Value::Object(mut object) = value else {
        return Err(ImportError::NotAnObject);
    };

    let snippets = match object.remove("snippets") {
        Some(Value::Array(items)) => items,
        _ => return Err(ImportError::MissingSnippets),
    };

    let mut skipped = 0;
    let data = StorageData {
        snippets: read_entries("snippets", snippets, &mut skipped),
        categories: optional_collection(&mut object, "categories", &mut skipped),
        projects: optional_collection(&mut object, "projects", &mut skipped),
        tags: optional_collection(&mut object, "tags", &mut skipped),
        folders: optional_collection(&mut object, "folders", &mut skipped),
        project_items: optional_collection(&mut object, "projectItems", &mut skipped),
    };
    Ok(ImportDocument { data, skipped })
}

fn optional_collection<T: DeserializeOwned>(
    object: &mut Map<String, Value>,
    key: &str,
    skipped: &mut usize,
) -> Vec<T> {
    match object.remove(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => read_entries(key, items, skipped),
        Some(_) => {
            warn!(collection = key, "ignoring import collection that is not an array");
            Vec::new()
        }
    }
}

fn read_entries<T: DeserializeOwned>(key: &str, items: Vec<Value>, skipped: &mut usize) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(collection = key, index, error = %err, "skipping unreadable import entry");
                *skipped += 1;
                None
            }
        })
        .collect()
}

/// Export database to a file
pub fn export_to_file(data: &StorageData, path: &Path) -> Result<()> {
    let json = export_json(data).context("Failed to serialize data to JSON")?;
    fs::write(path, json).context("Failed to write JSON export file")?;
    Ok(())
}

/// Read an export file without validating it
pub fn read_import_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, Folder, Snippet, SnippetLanguage};
    use pretty_assertions::assert_eq;

    #[test]
    fn export_uses_expected_top_level_keys() {
        let json = export_json(&StorageData::default()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            ["categories", "folders", "projectItems", "projects", "snippets", "tags"]
        );
        assert!(json.contains('\n'), "export should be pretty-printed");
    }

    #[test]
    fn rejects_missing_or_non_array_snippets() {
        assert!(matches!(parse_import("{}"), Err(ImportError::MissingSnippets)));
        assert!(matches!(
            parse_import(r#"{"snippets": {}}"#),
            Err(ImportError::MissingSnippets)
        ));
        assert!(matches!(parse_import("[]"), Err(ImportError::NotAnObject)));
        assert!(matches!(parse_import("not json"), Err(ImportError::InvalidJson(_))));
    }

    #[test]
    fn malformed_optional_collections_default_to_empty() {
        let doc = parse_import(r#"{"snippets": [], "folders": "oops", "tags": null}"#).unwrap();
        assert_eq!(doc.data, StorageData::default());
        assert_eq!(doc.skipped, 0);
    }

    #[test]
    fn unreadable_entries_are_dropped_individually() {
        let json = r#"{
            "snippets": [
                {"title": 3},
                {"id": "snippet-1", "title": "ok", "createdAt": "2024-04-05T10:00:00.000Z",
                 "updatedAt": "2024-04-05T10:00:00.000Z", "folderId": "folder-1"}
            ],
            "folders": [
                {"id": "folder-1", "name": "Work", "createdAt": "2024-04-05T10:00:00.000Z",
                 "updatedAt": "2024-04-05T10:00:00.000Z"},
                {"id": "folder-2", "name": "Broken"}
            ]
        }"#;

        let doc = parse_import(json).unwrap();
        assert_eq!(doc.skipped, 2);
        assert_eq!(doc.data.snippets.len(), 1);
        assert_eq!(doc.data.snippets[0].folder_id, Some(EntityId::from("folder-1")));
        assert_eq!(doc.data.folders.len(), 1);
        assert_eq!(doc.data.folders[0].name, "Work");
    }

    #[test]
    fn round_trips_through_export() {
        let folder = Folder::new("Work");
        let data = StorageData {
            snippets: vec![
                Snippet::new("ls", "ls -la", SnippetLanguage::Bash).in_folder(folder.id.clone()),
            ],
            folders: vec![folder],
            ..StorageData::default()
        };

        let parsed = parse_import(&export_json(&data).unwrap()).unwrap();
        assert_eq!(parsed.data, data);
        assert_eq!(parsed.skipped, 0);
    }
}
