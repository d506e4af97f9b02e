use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{SnippetStore, WriteOutcome};
use crate::clipboard::Clipboard;
use crate::hierarchy::{ParentIndex, descendant_folders, folders_under_projects, owning_project};
use crate::models::{Collection, EntityId, Folder, Snippet, SnippetPatch};

impl SnippetStore {
    /// Append a snippet. If it arrives with both a folder and a project the
    /// folder wins.
    pub fn add_snippet(&mut self, mut snippet: Snippet) -> WriteOutcome {
        if snippet.folder_id.is_some() && snippet.project_id.is_some() {
            warn!(snippet = %snippet.id, "new snippet has both folder and project, keeping folder");
            snippet.project_id = None;
        }
        info!(snippet = %snippet.id, title = %snippet.title, "adding snippet");
        self.snippets.push(snippet);
        self.commit(Collection::Snippets)
    }

    /// Merge `patch` into the snippet and stamp `updatedAt`.
    pub fn update_snippet(&mut self, id: &EntityId, patch: SnippetPatch) -> WriteOutcome {
        let Some(snippet) = self.snippet_mut(id) else {
            debug!(%id, "update for unknown snippet ignored");
            return WriteOutcome::Unchanged;
        };
        patch.apply_to(snippet);
        snippet.touch();
        self.commit(Collection::Snippets)
    }

    pub fn delete_snippet(&mut self, id: &EntityId) -> WriteOutcome {
        let Some(index) = self.snippets.iter().position(|s| &s.id == id) else {
            return WriteOutcome::Unchanged;
        };
        let removed = self.snippets.remove(index);
        info!(snippet = %removed.id, title = %removed.title, "deleted snippet");
        if self.selected_snippet.as_ref() == Some(id) {
            self.selected_snippet = None;
        }
        self.commit(Collection::Snippets)
    }

    /// Append a copy titled "Copy of …" and return it.
    pub fn duplicate_snippet(&mut self, id: &EntityId) -> Option<Snippet> {
        let copy = self.snippet(id)?.duplicate();
        info!(source = %id, snippet = %copy.id, "duplicated snippet");
        self.snippets.push(copy.clone());
        self.commit(Collection::Snippets);
        Some(copy)
    }

    pub fn toggle_favorite(&mut self, id: &EntityId) -> WriteOutcome {
        let Some(snippet) = self.snippet_mut(id) else {
            return WriteOutcome::Unchanged;
        };
        snippet.favorite = !snippet.favorite;
        self.commit(Collection::Snippets)
    }

    pub fn increment_usage_count(&mut self, id: &EntityId) -> WriteOutcome {
        let Some(snippet) = self.snippet_mut(id) else {
            return WriteOutcome::Unchanged;
        };
        snippet.mark_used();
        self.commit(Collection::Snippets)
    }

    /// Put a snippet in `folder_id`, or make it unassigned with `None`.
    /// Either way its project is cleared.
    pub fn move_snippet_to_folder(
        &mut self,
        snippet_id: &EntityId,
        folder_id: Option<&EntityId>,
    ) -> WriteOutcome {
        if self.snippet(snippet_id).is_none() {
            return WriteOutcome::Unchanged;
        }
        if let Some(folder) = folder_id
            && self.folder(folder).is_none()
        {
            warn!(snippet = %snippet_id, %folder, "move to unknown folder rejected");
            return WriteOutcome::Rejected;
        }

        let folder_id = folder_id.cloned();
        self.place_snippet(snippet_id, |snippet| snippet.assign_folder(folder_id))
    }

    /// Place a snippet in a project through one of its folders.
    ///
    /// `None` clears the project, and also the folder when that folder sits
    /// inside a project; a free-standing folder is kept. With a project the
    /// snippet goes to the project's first direct child folder, creating a
    /// default folder when the project has none.
    pub fn move_snippet_to_project(
        &mut self,
        snippet_id: &EntityId,
        project_id: Option<&EntityId>,
    ) -> WriteOutcome {
        let Some(snippet) = self.snippet(snippet_id) else {
            return WriteOutcome::Unchanged;
        };

        let Some(project) = project_id else {
            let in_project_folder = snippet.folder_id.as_ref().is_some_and(|folder| {
                owning_project(&self.folders, &self.project_items, folder).is_some()
            });
            return self.place_snippet(snippet_id, |snippet| {
                snippet.project_id = None;
                if in_project_folder {
                    snippet.folder_id = None;
                }
            });
        };

        if self.project_item(project).is_none() {
            warn!(snippet = %snippet_id, %project, "move to unknown project rejected");
            return WriteOutcome::Rejected;
        }

        let existing = ParentIndex::new(&self.folders)
            .children(project)
            .next()
            .map(|f| f.id.clone());
        let (folder, created) = match existing {
            Some(folder) => (folder, WriteOutcome::Unchanged),
            None => {
                let folder = Folder::new_with_parent(&self.settings.default_folder_name, project.clone());
                let id = folder.id.clone();
                info!(%project, folder = %id, name = %folder.name, "creating default project folder");
                self.folders.push(folder);
                (id, self.commit(Collection::Folders))
            }
        };

        created.and(self.place_snippet(snippet_id, |snippet| snippet.assign_folder(Some(folder))))
    }

    fn place_snippet(&mut self, id: &EntityId, place: impl FnOnce(&mut Snippet)) -> WriteOutcome {
        let Some(snippet) = self.snippet_mut(id) else {
            return WriteOutcome::Unchanged;
        };
        place(snippet);
        snippet.touch();
        debug!(snippet = %id, folder = ?snippet.folder_id, project = ?snippet.project_id, "moved snippet");
        self.commit(Collection::Snippets)
    }

    fn snippet_mut(&mut self, id: &EntityId) -> Option<&mut Snippet> {
        self.snippets.iter_mut().find(|s| &s.id == id)
    }

    /// Write the snippet's content to `clipboard` and count the use. Returns
    /// false, leaving usage untouched, when the snippet is missing or the
    /// clipboard refused the text.
    pub fn copy_snippet(&mut self, id: &EntityId, clipboard: &mut dyn Clipboard) -> bool {
        let Some(snippet) = self.snippet(id) else {
            return false;
        };
        if !clipboard.write_text(&snippet.content) {
            warn!(snippet = %id, "clipboard write failed");
            return false;
        }
        self.increment_usage_count(id);
        true
    }

    /// Snippets directly in `folder_id`, or anywhere below it when
    /// `recursive` is set.
    pub fn snippets_in_folder(&self, folder_id: &EntityId, recursive: bool) -> Vec<&Snippet> {
        let mut folders = HashSet::from([folder_id]);
        if recursive {
            folders.extend(descendant_folders(&self.folders, folder_id).iter().map(|f| &f.id));
        }
        self.snippets
            .iter()
            .filter(|s| s.folder_id.as_ref().is_some_and(|id| folders.contains(id)))
            .collect()
    }

    /// Snippets assigned to the project directly or through any folder
    /// below it.
    pub fn snippets_in_project(&self, project_id: &EntityId) -> Vec<&Snippet> {
        let projects = HashSet::from([project_id.clone()]);
        let folders: HashSet<EntityId> = folders_under_projects(&self.folders, &projects)
            .into_iter()
            .collect();
        self.snippets
            .iter()
            .filter(|s| {
                s.project_id.as_ref() == Some(project_id)
                    || s.folder_id.as_ref().is_some_and(|id| folders.contains(id))
            })
            .collect()
    }

    pub fn unassigned_snippets(&self) -> Vec<&Snippet> {
        self.snippets.iter().filter(|s| s.is_unassigned()).collect()
    }

    pub fn favorite_snippets(&self) -> Vec<&Snippet> {
        self.snippets.iter().filter(|s| s.favorite).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::models::SnippetLanguage;
    use pretty_assertions::assert_eq;

    fn store_with(snippet: Snippet) -> (SnippetStore, EntityId) {
        let mut store = SnippetStore::in_memory();
        let id = snippet.id.clone();
        store.add_snippet(snippet);
        (store, id)
    }

    fn add(store: &mut SnippetStore, snippet: Snippet) -> EntityId {
        let id = snippet.id.clone();
        store.add_snippet(snippet);
        id
    }

    fn exclusive(store: &SnippetStore) -> bool {
        store
            .snippets()
            .iter()
            .all(|s| s.folder_id.is_none() || s.project_id.is_none())
    }

    #[test]
    fn add_keeps_folder_when_both_are_set() {
        let mut snippet = Snippet::new("a", "", SnippetLanguage::Text).in_folder(EntityId::new());
        snippet.project_id = Some(EntityId::new());
        let (store, _) = store_with(snippet);
        assert!(exclusive(&store));
        assert!(store.snippets()[0].folder_id.is_some());
    }

    #[test]
    fn update_merges_and_stamps() {
        let (mut store, id) = store_with(Snippet::new("old", "body", SnippetLanguage::Text));
        let before = store.snippet(&id).unwrap().updated_at;

        let outcome = store.update_snippet(&id, SnippetPatch::default().title("new").tags(["a", "A"]));
        assert_eq!(outcome, WriteOutcome::Saved);

        let snippet = store.snippet(&id).unwrap();
        assert_eq!(snippet.title, "new");
        assert_eq!(snippet.content, "body");
        assert_eq!(snippet.tags, vec!["a"]);
        assert!(snippet.updated_at >= before);

        assert_eq!(
            store.update_snippet(&EntityId::new(), SnippetPatch::default()),
            WriteOutcome::Unchanged
        );
    }

    #[test]
    fn delete_clears_selection() {
        let (mut store, id) = store_with(Snippet::new("a", "", SnippetLanguage::Text));
        store.select_snippet(Some(id.clone()));
        assert_eq!(store.delete_snippet(&id), WriteOutcome::Saved);
        assert!(store.selected_snippet().is_none());
        assert_eq!(store.delete_snippet(&id), WriteOutcome::Unchanged);
    }

    #[test]
    fn duplicate_resets_usage_and_favorite() {
        let (mut store, id) = store_with(Snippet::new("Deploy", "make", SnippetLanguage::Bash));
        store.toggle_favorite(&id);
        store.increment_usage_count(&id);

        let copy = store.duplicate_snippet(&id).unwrap();
        assert_eq!(copy.title, "Copy of Deploy");
        assert_ne!(copy.id, id);
        assert!(!copy.favorite);
        assert_eq!(copy.usage_count, 0);
        assert_eq!(copy.last_used, None);
        assert_eq!(store.snippets().len(), 2);
        assert!(store.duplicate_snippet(&EntityId::new()).is_none());
    }

    #[test]
    fn editing_a_duplicate_leaves_the_source_alone() {
        let (mut store, id) = store_with(
            Snippet::new("Deploy", "make deploy", SnippetLanguage::Bash).with_tags(["ops"]),
        );
        let source = store.snippet(&id).unwrap().clone();
        let copy = store.duplicate_snippet(&id).unwrap().id;

        store.update_snippet(
            &copy,
            SnippetPatch::default()
                .title("Deploy staging")
                .content("make deploy ENV=staging")
                .tags(["ops", "staging"]),
        );
        store.toggle_favorite(&copy);
        store.increment_usage_count(&copy);

        assert_eq!(store.snippet(&id), Some(&source));
        let edited = store.snippet(&copy).unwrap();
        assert_eq!(edited.title, "Deploy staging");
        assert!(edited.favorite);
        assert_eq!(edited.usage_count, 1);
    }

    #[test]
    fn usage_and_favorite_toggle() {
        let (mut store, id) = store_with(Snippet::new("a", "", SnippetLanguage::Text));
        store.increment_usage_count(&id);
        store.increment_usage_count(&id);
        store.toggle_favorite(&id);
        store.toggle_favorite(&id);
        store.toggle_favorite(&id);

        let snippet = store.snippet(&id).unwrap();
        assert_eq!(snippet.usage_count, 2);
        assert!(snippet.last_used.is_some());
        assert!(snippet.favorite);
    }

    #[test]
    fn folder_moves_clear_the_project() {
        let mut store = SnippetStore::in_memory();
        let project = store.add_project_item("Site", None, None).unwrap();
        let folder = store.add_folder("Scratch", None).unwrap();
        let id = add(&mut store, Snippet::new("a", "", SnippetLanguage::Text).in_project(project));

        assert_eq!(store.move_snippet_to_folder(&id, Some(&folder)), WriteOutcome::Saved);
        assert_eq!(store.snippet(&id).unwrap().folder_id, Some(folder.clone()));
        assert_eq!(store.snippet(&id).unwrap().project_id, None);

        assert_eq!(
            store.move_snippet_to_folder(&id, Some(&EntityId::new())),
            WriteOutcome::Rejected
        );
        assert_eq!(store.snippet(&id).unwrap().folder_id, Some(folder));

        store.move_snippet_to_folder(&id, None);
        assert!(store.snippet(&id).unwrap().is_unassigned());
        assert!(exclusive(&store));
    }

    #[test]
    fn project_move_creates_default_folder_once() {
        let mut store = SnippetStore::in_memory();
        let project = store.add_project_item("Site", None, None).unwrap();
        let a = add(&mut store, Snippet::new("a", "", SnippetLanguage::Text));
        let b = add(&mut store, Snippet::new("b", "", SnippetLanguage::Text));

        assert_eq!(store.move_snippet_to_project(&a, Some(&project)), WriteOutcome::Saved);
        assert_eq!(store.folders().len(), 1);
        let folder = &store.folders()[0];
        assert_eq!(folder.name, "Snippets");
        assert_eq!(folder.parent_id, Some(project.clone()));
        let folder = folder.id.clone();

        store.move_snippet_to_project(&b, Some(&project));
        assert_eq!(store.folders().len(), 1);
        assert_eq!(store.snippet(&b).unwrap().folder_id, Some(folder));
        assert_eq!(store.snippets_in_project(&project).len(), 2);
        assert!(exclusive(&store));
    }

    #[test]
    fn clearing_the_project_keeps_free_standing_folders() {
        let mut store = SnippetStore::in_memory();
        let project = store.add_project_item("Site", None, None).unwrap();
        let inner = store.add_folder("src", Some(&project)).unwrap();
        let free = store.add_folder("misc", None).unwrap();

        let a = add(&mut store, Snippet::new("a", "", SnippetLanguage::Text).in_folder(inner));
        let b = add(&mut store, Snippet::new("b", "", SnippetLanguage::Text).in_folder(free.clone()));

        store.move_snippet_to_project(&a, None);
        store.move_snippet_to_project(&b, None);
        assert!(store.snippet(&a).unwrap().is_unassigned());
        assert_eq!(store.snippet(&b).unwrap().folder_id, Some(free));
    }

    #[test]
    fn copy_counts_usage_only_on_success() {
        let (mut store, id) = store_with(Snippet::new("a", "echo hi", SnippetLanguage::Bash));

        let mut broken = MemoryClipboard::failing();
        assert!(!store.copy_snippet(&id, &mut broken));
        assert_eq!(store.snippet(&id).unwrap().usage_count, 0);

        let mut clipboard = MemoryClipboard::default();
        assert!(store.copy_snippet(&id, &mut clipboard));
        assert_eq!(clipboard.contents(), Some("echo hi"));
        assert_eq!(store.snippet(&id).unwrap().usage_count, 1);
    }

    #[test]
    fn recursive_folder_listing() {
        let mut store = SnippetStore::in_memory();
        let top = store.add_folder("top", None).unwrap();
        let nested = store.add_folder("nested", Some(&top)).unwrap();
        add(&mut store, Snippet::new("a", "", SnippetLanguage::Text).in_folder(top.clone()));
        add(&mut store, Snippet::new("b", "", SnippetLanguage::Text).in_folder(nested));
        add(&mut store, Snippet::new("c", "", SnippetLanguage::Text));

        assert_eq!(store.snippets_in_folder(&top, false).len(), 1);
        assert_eq!(store.snippets_in_folder(&top, true).len(), 2);
        assert_eq!(store.unassigned_snippets().len(), 1);
    }
}
