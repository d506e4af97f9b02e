//! The in-memory source of truth.
//!
//! [`SnippetStore`] owns every collection. Each mutation updates memory,
//! writes the affected collection through [`Storage`], refreshes derived
//! views and notifies subscribers before returning. Lookups by id fail soft:
//! a missing entity turns the call into a no-op reported as
//! [`WriteOutcome::Unchanged`].

mod folders;
mod snippets;

use std::fmt;

use tracing::{debug, info, warn};

use crate::cleanup::{CleanupReport, cleanup_orphans};
use crate::counts::SnippetCounts;
use crate::models::{
    Category, Collection, EntityId, Folder, ImportError, Project, ProjectItem, Snippet, Storage,
    StorageData, Tag, export_json, parse_import,
};
use crate::search::{SearchResult, search_snippets};

pub use folders::{DeleteChoice, DeleteOutcome};

/// Result of a state-changing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Applied in memory and persisted.
    Saved,
    /// Nothing to do, usually because the id was not found.
    Unchanged,
    /// Applied in memory but the write failed; memory and storage differ
    /// until the next successful write of that collection.
    Unsaved,
    /// Refused because it would break an invariant (empty name, missing
    /// parent, parent cycle). State is untouched.
    Rejected,
}

impl WriteOutcome {
    fn from_persisted(saved: bool) -> Self {
        if saved {
            WriteOutcome::Saved
        } else {
            WriteOutcome::Unsaved
        }
    }

    /// Whether the in-memory state changed.
    pub fn is_applied(self) -> bool {
        matches!(self, WriteOutcome::Saved | WriteOutcome::Unsaved)
    }

    /// Merge the outcomes of several writes belonging to one operation.
    fn and(self, other: WriteOutcome) -> WriteOutcome {
        use WriteOutcome::*;
        match (self, other) {
            (Unsaved, _) | (_, Unsaved) => Unsaved,
            (Saved, _) | (_, Saved) => Saved,
            (Rejected, _) | (_, Rejected) => Rejected,
            (Unchanged, Unchanged) => Unchanged,
        }
    }
}

#[derive(Debug)]
pub enum ImportOutcome {
    Imported {
        snippets: usize,
        /// Unreadable entries left out of the import.
        skipped: usize,
        persisted: bool,
        cleanup: CleanupReport,
    },
    Rejected(ImportError),
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Imported { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Folder created when a snippet moves into a project without folders.
    pub default_folder_name: String,
    /// Run orphan cleanup right after loading persisted data.
    pub cleanup_on_open: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            default_folder_name: String::from("Snippets"),
            cleanup_on_open: true,
        }
    }
}

type Listener = Box<dyn FnMut(Collection)>;

pub struct SnippetStore {
    storage: Storage,
    settings: StoreSettings,

    snippets: Vec<Snippet>,
    categories: Vec<Category>,
    projects: Vec<Project>,
    tags: Vec<Tag>,
    folders: Vec<Folder>,
    project_items: Vec<ProjectItem>,

    selected_snippet: Option<EntityId>,
    selected_folder: Option<EntityId>,
    selected_project: Option<EntityId>,
    search_query: String,
    search_results: Vec<SearchResult>,

    listeners: Vec<Listener>,
}

// Listeners are closures, so Debug is written by hand.
impl fmt::Debug for SnippetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnippetStore")
            .field("storage", &self.storage)
            .field("settings", &self.settings)
            .field("snippets", &self.snippets.len())
            .field("folders", &self.folders.len())
            .field("project_items", &self.project_items.len())
            .field("selected_snippet", &self.selected_snippet)
            .field("search_query", &self.search_query)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl SnippetStore {
    /// An empty store on top of `storage`, nothing loaded yet.
    pub fn new(storage: Storage, settings: StoreSettings) -> Self {
        Self {
            storage,
            settings,
            snippets: Vec::new(),
            categories: Vec::new(),
            projects: Vec::new(),
            tags: Vec::new(),
            folders: Vec::new(),
            project_items: Vec::new(),
            selected_snippet: None,
            selected_folder: None,
            selected_project: None,
            search_query: String::new(),
            search_results: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Load everything from `storage` and, if configured, repair dangling
    /// references.
    pub fn open(storage: Storage, settings: StoreSettings) -> Self {
        let mut store = Self::new(storage, settings);
        store.load_persisted_data();
        if store.settings.cleanup_on_open {
            store.cleanup_orphaned_data();
        }
        store
    }

    /// A store backed by a fresh in-memory key-value store.
    pub fn in_memory() -> Self {
        Self::new(Storage::in_memory(), StoreSettings::default())
    }

    pub fn load_persisted_data(&mut self) {
        let data = self.storage.load_all();
        debug!(
            snippets = data.snippets.len(),
            folders = data.folders.len(),
            project_items = data.project_items.len(),
            "loaded persisted data"
        );
        self.replace_all(data);
        self.selected_snippet = self.snippets.first().map(|s| s.id.clone());
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Register a callback invoked with each collection a mutation changed.
    pub fn subscribe(&mut self, listener: impl FnMut(Collection) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ---- read access ----

    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn project_items(&self) -> &[ProjectItem] {
        &self.project_items
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Legacy flat project labels.
    pub fn legacy_projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn snippet(&self, id: &EntityId) -> Option<&Snippet> {
        self.snippets.iter().find(|s| &s.id == id)
    }

    pub fn folder(&self, id: &EntityId) -> Option<&Folder> {
        self.folders.iter().find(|f| &f.id == id)
    }

    pub fn project_item(&self, id: &EntityId) -> Option<&ProjectItem> {
        self.project_items.iter().find(|p| &p.id == id)
    }

    pub fn counts(&self) -> SnippetCounts {
        SnippetCounts::compute(&self.snippets)
    }

    // ---- selection ----

    pub fn selected_snippet(&self) -> Option<&Snippet> {
        self.selected_snippet.as_ref().and_then(|id| self.snippet(id))
    }

    pub fn selected_folder_id(&self) -> Option<&EntityId> {
        self.selected_folder.as_ref()
    }

    pub fn selected_project_id(&self) -> Option<&EntityId> {
        self.selected_project.as_ref()
    }

    pub fn select_snippet(&mut self, id: Option<EntityId>) {
        self.selected_snippet = id;
    }

    /// Folder and project selection are exclusive.
    pub fn select_folder(&mut self, id: Option<EntityId>) {
        self.selected_folder = id;
        self.selected_project = None;
    }

    pub fn select_project(&mut self, id: Option<EntityId>) {
        self.selected_project = id;
        self.selected_folder = None;
    }

    // ---- search ----

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.search_results
    }

    /// Store the query and recompute results. A blank query clears them.
    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.refresh_search();
    }

    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        search_snippets(&self.snippets, query)
    }

    fn refresh_search(&mut self) {
        self.search_results = search_snippets(&self.snippets, &self.search_query);
    }

    // ---- import / export ----

    /// Snapshot of every collection.
    pub fn data(&self) -> StorageData {
        StorageData {
            snippets: self.snippets.clone(),
            categories: self.categories.clone(),
            projects: self.projects.clone(),
            tags: self.tags.clone(),
            folders: self.folders.clone(),
            project_items: self.project_items.clone(),
        }
    }

    pub fn export_data(&self) -> serde_json::Result<String> {
        export_json(&self.data())
    }

    /// Replace the whole state with an export document. Invalid input leaves
    /// memory and storage untouched.
    pub fn import_data(&mut self, json: &str) -> ImportOutcome {
        let (data, skipped) = match parse_import(json) {
            Ok(doc) => (doc.data, doc.skipped),
            Err(err) => {
                warn!(error = %err, "import rejected");
                return ImportOutcome::Rejected(err);
            }
        };

        let persisted = self.storage.save_all(&data);
        let snippets = data.snippets.len();
        self.replace_all(data);
        self.retain_valid_selection();
        self.refresh_search();
        for collection in Collection::ALL {
            self.notify(collection);
        }
        info!(snippets, skipped, persisted, "imported data");

        let cleanup = self.cleanup_orphaned_data();
        ImportOutcome::Imported {
            snippets,
            skipped,
            persisted,
            cleanup,
        }
    }

    fn replace_all(&mut self, data: StorageData) {
        self.snippets = data.snippets;
        self.categories = data.categories;
        self.projects = data.projects;
        self.tags = data.tags;
        self.folders = data.folders;
        self.project_items = data.project_items;
    }

    // ---- maintenance ----

    /// Clear references to folders and projects that no longer exist.
    /// Writes only when something was repaired.
    pub fn cleanup_orphaned_data(&mut self) -> CleanupReport {
        let report = cleanup_orphans(&mut self.snippets, &mut self.folders, &self.project_items);

        if !report.has_changes() {
            debug!("no orphaned data to clean up");
            return report;
        }

        if report.folders_changed() {
            self.commit(Collection::Folders);
        }
        if report.snippets_changed() {
            self.commit(Collection::Snippets);
        }
        info!(repairs = report.repairs(), "cleaned up orphaned data");
        report
    }

    /// Remove every persisted collection and empty the store.
    pub fn clear_all_data(&mut self) -> bool {
        let cleared = self.storage.clear_all();
        self.replace_all(StorageData::default());
        self.selected_snippet = None;
        self.selected_folder = None;
        self.selected_project = None;
        self.refresh_search();
        for collection in Collection::ALL {
            self.notify(collection);
        }
        cleared
    }

    pub fn has_data(&self) -> bool {
        self.storage.has_data()
    }

    // ---- persistence plumbing ----

    /// Persist one collection, refresh derived views and notify.
    fn commit(&mut self, collection: Collection) -> WriteOutcome {
        let saved = match collection {
            Collection::Snippets => self.storage.save_snippets(&self.snippets),
            Collection::Categories => self.storage.save_categories(&self.categories),
            Collection::Projects => self.storage.save_projects(&self.projects),
            Collection::Tags => self.storage.save_tags(&self.tags),
            Collection::Folders => self.storage.save_folders(&self.folders),
            Collection::ProjectItems => self.storage.save_project_items(&self.project_items),
        };

        if collection == Collection::Snippets && !self.search_query.trim().is_empty() {
            self.refresh_search();
        }
        self.notify(collection);
        WriteOutcome::from_persisted(saved)
    }

    fn notify(&mut self, collection: Collection) {
        for listener in &mut self.listeners {
            listener(collection);
        }
    }

    fn retain_valid_selection(&mut self) {
        if self.selected_snippet.as_ref().is_some_and(|id| self.snippet(id).is_none()) {
            self.selected_snippet = None;
        }
        if self.selected_folder.as_ref().is_some_and(|id| self.folder(id).is_none()) {
            self.selected_folder = None;
        }
        if self
            .selected_project
            .as_ref()
            .is_some_and(|id| self.project_item(id).is_none())
        {
            self.selected_project = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemoryStore, SnippetLanguage};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn outcome_merge_prefers_failure() {
        use WriteOutcome::*;
        assert_eq!(Saved.and(Unsaved), Unsaved);
        assert_eq!(Unchanged.and(Saved), Saved);
        assert_eq!(Unchanged.and(Unchanged), Unchanged);
        assert!(!Rejected.is_applied());
    }

    #[test]
    fn open_loads_selects_first_and_repairs() {
        let memory = MemoryStore::new();
        let mut seed = Storage::new(memory.clone());
        let dangling = Snippet::new("a", "", SnippetLanguage::Text).in_folder(EntityId::new());
        let second = Snippet::new("b", "", SnippetLanguage::Text);
        assert!(seed.save_snippets(&[dangling.clone(), second]));

        let store = SnippetStore::open(Storage::new(memory), StoreSettings::default());
        assert_eq!(store.snippets().len(), 2);
        assert_eq!(store.selected_snippet().map(|s| &s.id), Some(&dangling.id));
        assert!(store.snippets()[0].is_unassigned());
    }

    #[test]
    fn cleanup_without_repairs_does_not_write() {
        let memory = MemoryStore::new();
        let mut store = SnippetStore::new(Storage::new(memory.clone()), StoreSettings::default());
        store.add_snippet(Snippet::new("a", "", SnippetLanguage::Text));
        let writes = memory.write_count();

        assert!(!store.cleanup_orphaned_data().has_changes());
        assert_eq!(memory.write_count(), writes);
    }

    #[test]
    fn failed_write_keeps_memory_state() {
        let memory = MemoryStore::with_quota(8);
        let mut store = SnippetStore::new(Storage::new(memory.clone()), StoreSettings::default());

        let outcome = store.add_snippet(Snippet::new("big", "x".repeat(64), SnippetLanguage::Text));
        assert_eq!(outcome, WriteOutcome::Unsaved);
        assert_eq!(store.snippets().len(), 1);
        assert_eq!(memory.raw(Collection::Snippets.key()), None);
    }

    #[test]
    fn listeners_hear_each_committed_collection() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut store = SnippetStore::in_memory();
        let sink = Rc::clone(&seen);
        store.subscribe(move |collection| sink.borrow_mut().push(collection));

        let folder = store.add_folder("Work", None).unwrap();
        store.add_snippet(Snippet::new("a", "", SnippetLanguage::Text).in_folder(folder));

        assert_eq!(*seen.borrow(), vec![Collection::Folders, Collection::Snippets]);
    }

    #[test]
    fn active_query_follows_snippet_changes() {
        let mut store = SnippetStore::in_memory();
        store.set_search_query("docker");
        assert!(store.search_results().is_empty());

        let snippet = Snippet::new("Docker prune", "", SnippetLanguage::Bash);
        let id = snippet.id.clone();
        store.add_snippet(snippet);
        assert_eq!(store.search_results().len(), 1);

        store.delete_snippet(&id);
        assert!(store.search_results().is_empty());

        store.set_search_query("  ");
        assert!(store.search_results().is_empty());
    }

    #[test]
    fn folder_and_project_selection_are_exclusive() {
        let mut store = SnippetStore::in_memory();
        let folder = EntityId::new();
        let project = EntityId::new();

        store.select_folder(Some(folder.clone()));
        store.select_project(Some(project.clone()));
        assert_eq!(store.selected_folder_id(), None);
        assert_eq!(store.selected_project_id(), Some(&project));

        store.select_folder(Some(folder));
        assert_eq!(store.selected_project_id(), None);
    }

    #[test]
    fn rejected_import_leaves_state_untouched() {
        let mut store = SnippetStore::in_memory();
        store.add_snippet(Snippet::new("keep", "", SnippetLanguage::Text));
        let before = store.data();

        let outcome = store.import_data(r#"{"folders": []}"#);
        assert!(!outcome.is_success());
        assert_eq!(store.data(), before);
    }

    const TIMESTAMP: &str = "2024-04-05T19:21:18.901Z";

    #[test]
    fn imports_documents_with_free_form_ids() {
        let mut store = SnippetStore::in_memory();
        let json = format!(
            r#"{{
                "snippets": [{{
                    "id": "snippet-1712345678901",
                    "title": "List files",
                    "description": "",
                    "content": "ls -la",
                    "language": "bash",
                    "tags": ["shell"],
                    "category": "bash",
                    "folderId": "folder-1712345600000",
                    "favorite": false,
                    "createdAt": "{TIMESTAMP}",
                    "updatedAt": "{TIMESTAMP}",
                    "usage_count": 0
                }}],
                "categories": [],
                "projects": [],
                "tags": [],
                "folders": [{{
                    "id": "folder-1712345600000",
                    "name": "Shell",
                    "createdAt": "{TIMESTAMP}",
                    "updatedAt": "{TIMESTAMP}"
                }}],
                "projectItems": []
            }}"#
        );

        let ImportOutcome::Imported {
            snippets, skipped, cleanup, ..
        } = store.import_data(&json)
        else {
            panic!("import was rejected");
        };
        assert_eq!((snippets, skipped), (1, 0));
        assert!(!cleanup.has_changes());

        let id = EntityId::from("snippet-1712345678901");
        assert_eq!(
            store.snippet(&id).and_then(|s| s.folder_id.clone()),
            Some(EntityId::from("folder-1712345600000"))
        );
        assert_eq!(store.toggle_favorite(&id), WriteOutcome::Saved);
        assert!(store.export_data().unwrap().contains("\"snippet-1712345678901\""));
    }

    #[test]
    fn one_broken_folder_does_not_detach_the_rest() {
        let mut store = SnippetStore::in_memory();
        let json = format!(
            r#"{{
                "snippets": [{{
                    "id": "snippet-1",
                    "title": "query",
                    "folderId": "folder-ok",
                    "createdAt": "{TIMESTAMP}",
                    "updatedAt": "{TIMESTAMP}"
                }}],
                "folders": [
                    {{"id": "folder-ok", "name": "Sql", "createdAt": "{TIMESTAMP}", "updatedAt": "{TIMESTAMP}"}},
                    {{"id": "folder-bad", "name": "Broken"}}
                ]
            }}"#
        );

        let ImportOutcome::Imported { skipped, cleanup, .. } = store.import_data(&json) else {
            panic!("import was rejected");
        };
        assert_eq!(skipped, 1);
        assert!(!cleanup.has_changes());
        assert_eq!(store.folders().len(), 1);
        assert_eq!(
            store.snippets()[0].folder_id,
            Some(EntityId::from("folder-ok"))
        );
    }

    #[test]
    fn clear_all_data_empties_memory_and_storage() {
        let mut store = SnippetStore::in_memory();
        store.add_snippet(Snippet::new("a", "", SnippetLanguage::Text));
        assert!(store.has_data());

        assert!(store.clear_all_data());
        assert!(store.snippets().is_empty());
        assert!(!store.has_data());
    }
}
