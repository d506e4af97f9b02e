//! Persistence adapter.
//!
//! Every collection is stored as one JSON array under its own key. Writes are
//! all-or-nothing per collection and best-effort per call: a failed write is
//! logged and reported as `false`, never raised to the caller.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Category, Folder, Project, ProjectItem, Snippet, Tag};

/// The persisted collections, one storage key each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Snippets,
    Categories,
    Projects,
    Tags,
    Folders,
    ProjectItems,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Snippets,
        Collection::Categories,
        Collection::Projects,
        Collection::Tags,
        Collection::Folders,
        Collection::ProjectItems,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Collection::Snippets => "snipvault-snippets",
            Collection::Categories => "snipvault-categories",
            Collection::Projects => "snipvault-projects",
            Collection::Tags => "snipvault-tags",
            Collection::Folders => "snipvault-folders",
            Collection::ProjectItems => "snipvault-project-items",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read `{key}`")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write `{key}`")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("storage quota exceeded writing `{key}`: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("failed to serialize `{key}`")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine a data directory")]
    NoDataDir,
}

/// Minimal durable key-value capability the engine persists through.
pub trait KeyValueStore: fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per collection inside a data directory.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|source| StorageError::Write {
            key: data_dir.display().to_string(),
            source,
        })?;
        Ok(Self { data_dir })
    }

    /// `$XDG_DATA_HOME/snipvault` or the platform equivalent.
    pub fn default_dir() -> Result<PathBuf, StorageError> {
        dirs::data_dir()
            .map(|dir| dir.join("snipvault"))
            .ok_or(StorageError::NoDataDir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let to_error = |source| StorageError::Write {
            key: key.to_string(),
            source,
        };

        // readers only ever see the old or the new array
        fs::write(&tmp, value).map_err(to_error)?;
        fs::rename(&tmp, &path).map_err(to_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    quota: Option<usize>,
    writes: usize,
}

/// In-memory store. Clones share the same entries, so a test can keep a
/// handle after moving one into a [`Storage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the total stored bytes; writes past the cap fail like a full
    /// browser storage would.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.set_quota(Some(bytes));
        store
    }

    pub fn set_quota(&self, bytes: Option<usize>) {
        self.inner.borrow_mut().quota = bytes;
    }

    /// Number of successful writes and removals so far.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.inner
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        if let Some(quota) = inner.quota {
            let others: usize = inner
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let available = quota.saturating_sub(others);
            if value.len() > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed: value.len(),
                    available,
                });
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.borrow_mut();
        inner.entries.remove(key);
        inner.writes += 1;
        Ok(())
    }
}

/// Every persisted collection at once. Also the export document shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageData {
    pub snippets: Vec<Snippet>,
    pub categories: Vec<Category>,
    pub projects: Vec<Project>,
    pub tags: Vec<Tag>,
    pub folders: Vec<Folder>,
    pub project_items: Vec<ProjectItem>,
}

impl StorageData {
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
            && self.categories.is_empty()
            && self.projects.is_empty()
            && self.tags.is_empty()
            && self.folders.is_empty()
            && self.project_items.is_empty()
    }
}

/// Typed access to the collections on top of a [`KeyValueStore`].
#[derive(Debug)]
pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn save<T: Serialize>(&mut self, collection: Collection, items: &[T]) -> bool {
        let key = collection.key();
        let result = serde_json::to_string(items)
            .map_err(|source| StorageError::Serialize {
                key: key.to_string(),
                source,
            })
            .and_then(|json| self.backend.set(key, &json));

        match result {
            Ok(()) => {
                debug!(%collection, count = items.len(), "saved collection");
                true
            }
            Err(err) => {
                warn!(%collection, error = %err, "failed to save collection");
                false
            }
        }
    }

    fn load<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        let raw = match self.backend.get(collection.key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(%collection, error = %err, "failed to read collection, using empty");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(%collection, error = %err, "corrupt collection, using empty");
            Vec::new()
        })
    }

    pub fn save_snippets(&mut self, snippets: &[Snippet]) -> bool {
        self.save(Collection::Snippets, snippets)
    }

    pub fn load_snippets(&self) -> Vec<Snippet> {
        self.load(Collection::Snippets)
    }

    pub fn save_categories(&mut self, categories: &[Category]) -> bool {
        self.save(Collection::Categories, categories)
    }

    pub fn load_categories(&self) -> Vec<Category> {
        self.load(Collection::Categories)
    }

    pub fn save_projects(&mut self, projects: &[Project]) -> bool {
        self.save(Collection::Projects, projects)
    }

    pub fn load_projects(&self) -> Vec<Project> {
        self.load(Collection::Projects)
    }

    pub fn save_tags(&mut self, tags: &[Tag]) -> bool {
        self.save(Collection::Tags, tags)
    }

    pub fn load_tags(&self) -> Vec<Tag> {
        self.load(Collection::Tags)
    }

    pub fn save_folders(&mut self, folders: &[Folder]) -> bool {
        self.save(Collection::Folders, folders)
    }

    pub fn load_folders(&self) -> Vec<Folder> {
        self.load(Collection::Folders)
    }

    pub fn save_project_items(&mut self, project_items: &[ProjectItem]) -> bool {
        self.save(Collection::ProjectItems, project_items)
    }

    pub fn load_project_items(&self) -> Vec<ProjectItem> {
        self.load(Collection::ProjectItems)
    }

    pub fn load_all(&self) -> StorageData {
        StorageData {
            snippets: self.load_snippets(),
            categories: self.load_categories(),
            projects: self.load_projects(),
            tags: self.load_tags(),
            folders: self.load_folders(),
            project_items: self.load_project_items(),
        }
    }

    /// Attempts every collection even after a failure; `true` only if all
    /// writes succeeded.
    pub fn save_all(&mut self, data: &StorageData) -> bool {
        let results = [
            self.save_snippets(&data.snippets),
            self.save_categories(&data.categories),
            self.save_projects(&data.projects),
            self.save_tags(&data.tags),
            self.save_folders(&data.folders),
            self.save_project_items(&data.project_items),
        ];
        results.iter().all(|saved| *saved)
    }

    pub fn clear_all(&mut self) -> bool {
        let mut cleared = true;
        for collection in Collection::ALL {
            if let Err(err) = self.backend.remove(collection.key()) {
                warn!(%collection, error = %err, "failed to clear collection");
                cleared = false;
            }
        }
        cleared
    }

    pub fn has_data(&self) -> bool {
        !self.load_all().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnippetLanguage;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn absent_and_corrupt_collections_load_empty() {
        let memory = MemoryStore::new();
        memory.insert_raw(Collection::Folders.key(), "{not json");
        let storage = Storage::new(memory);

        assert!(storage.load_snippets().is_empty());
        assert!(storage.load_folders().is_empty());
        assert!(!storage.has_data());
    }

    #[test]
    fn quota_failure_reports_false_and_keeps_old_value() {
        let memory = MemoryStore::new();
        let mut storage = Storage::new(memory.clone());
        let small = vec![Snippet::new("a", "", SnippetLanguage::Text)];
        assert!(storage.save_snippets(&small));
        let before = memory.raw(Collection::Snippets.key());

        memory.set_quota(Some(16));
        let big = vec![Snippet::new("b", "x".repeat(512), SnippetLanguage::Text)];
        assert!(!storage.save_snippets(&big));
        assert_eq!(memory.raw(Collection::Snippets.key()), before);
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = TempDir::new().unwrap();
        let mut storage = Storage::new(FileStore::open(dir.path()).unwrap());

        let folders = vec![Folder::new("Work")];
        assert!(storage.save_folders(&folders));
        assert!(dir.path().join("snipvault-folders.json").exists());
        assert_eq!(storage.load_folders(), folders);
        assert!(storage.has_data());

        assert!(storage.clear_all());
        assert!(storage.load_folders().is_empty());
        assert!(!storage.has_data());
    }

    #[test]
    fn save_all_writes_every_collection() {
        let memory = MemoryStore::new();
        let mut storage = Storage::new(memory.clone());
        let data = StorageData {
            tags: vec![Tag::new("web", "#00ff00")],
            ..StorageData::default()
        };

        assert!(storage.save_all(&data));
        assert_eq!(memory.write_count(), Collection::ALL.len());
        assert_eq!(storage.load_all(), data);
    }
}
