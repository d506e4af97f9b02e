use tracing::{debug, info, warn};

use super::{SnippetStore, WriteOutcome};
use crate::hierarchy::{
    DeletionPlan, DeletionTarget, descendant_folders, descendant_projects, would_create_cycle,
};
use crate::models::{Collection, EntityId, Folder, FolderPatch, ProjectItem, ProjectPatch};

/// What to do with snippets inside a subtree that is being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteChoice {
    /// Keep the snippets as unassigned.
    DetachSnippets,
    /// Delete them along with the subtree.
    DeleteSnippets,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The subtree held no snippets and is gone.
    Deleted(WriteOutcome),
    /// Nothing was changed. Settle it with [`SnippetStore::resolve_deletion`].
    NeedsConfirmation(DeletionPlan),
    NotFound,
}

impl SnippetStore {
    // ---- folders ----

    /// Create a folder at the root or under an existing folder or project.
    /// Returns `None` for a blank name or an unknown parent.
    pub fn add_folder(&mut self, name: &str, parent_id: Option<&EntityId>) -> Option<EntityId> {
        if name.trim().is_empty() {
            warn!("folder name is empty");
            return None;
        }
        let folder = match parent_id {
            Some(parent) if !self.is_container(parent) => {
                warn!(%parent, "folder parent does not exist");
                return None;
            }
            Some(parent) => Folder::new_with_parent(name, parent.clone()),
            None => Folder::new(name),
        };

        let id = folder.id.clone();
        info!(folder = %id, name = %folder.name, parent = ?folder.parent_id, "adding folder");
        self.folders.push(folder);
        self.commit(Collection::Folders);
        Some(id)
    }

    /// Rename or move a folder. Moving a folder below itself is rejected.
    pub fn update_folder(&mut self, id: &EntityId, patch: FolderPatch) -> WriteOutcome {
        if self.folder(id).is_none() {
            return WriteOutcome::Unchanged;
        }
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return WriteOutcome::Rejected;
        }
        if let Some(Some(parent)) = &patch.parent_id {
            if !self.is_container(parent) {
                warn!(folder = %id, %parent, "folder parent does not exist");
                return WriteOutcome::Rejected;
            }
            if would_create_cycle(&self.folders, id, parent) {
                warn!(folder = %id, %parent, "refusing to move folder below itself");
                return WriteOutcome::Rejected;
            }
        }

        let Some(folder) = self.folders.iter_mut().find(|f| &f.id == id) else {
            return WriteOutcome::Unchanged;
        };
        if let Some(name) = patch.name {
            folder.name = name.trim().to_string();
        }
        if let Some(parent) = patch.parent_id {
            folder.parent_id = parent;
        }
        folder.updated_at = chrono::Utc::now();
        self.commit(Collection::Folders)
    }

    pub fn get_descendant_folders(&self, folder_id: &EntityId) -> Vec<&Folder> {
        descendant_folders(&self.folders, folder_id)
    }

    /// Delete a folder and its subfolders, asking for confirmation first when
    /// any snippet lives inside.
    pub fn delete_folder(&mut self, id: &EntityId) -> DeleteOutcome {
        self.request_deletion(DeletionTarget::Folder(id.clone()))
    }

    /// Delete a folder subtree, detaching any snippets inside.
    pub fn force_delete_folder(&mut self, id: &EntityId) -> WriteOutcome {
        self.resolve_deletion(DeletionTarget::Folder(id.clone()), DeleteChoice::DetachSnippets)
    }

    // ---- projects ----

    pub fn add_project_item(
        &mut self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<&EntityId>,
    ) -> Option<EntityId> {
        if name.trim().is_empty() {
            warn!("project name is empty");
            return None;
        }
        let project = match parent_id {
            Some(parent) if self.project_item(parent).is_none() => {
                warn!(%parent, "parent project does not exist");
                return None;
            }
            Some(parent) => ProjectItem::new_with_parent(name, description, parent.clone()),
            None => ProjectItem::new(name, description),
        };

        let id = project.id.clone();
        info!(project = %id, name = %project.name, "adding project");
        self.project_items.push(project);
        self.commit(Collection::ProjectItems);
        Some(id)
    }

    pub fn update_project_item(&mut self, id: &EntityId, patch: ProjectPatch) -> WriteOutcome {
        if self.project_item(id).is_none() {
            return WriteOutcome::Unchanged;
        }
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return WriteOutcome::Rejected;
        }
        if let Some(Some(parent)) = &patch.parent_id
            && (self.project_item(parent).is_none() || would_create_cycle(&self.project_items, id, parent))
        {
            warn!(project = %id, %parent, "rejected project move");
            return WriteOutcome::Rejected;
        }

        let Some(project) = self.project_items.iter_mut().find(|p| &p.id == id) else {
            return WriteOutcome::Unchanged;
        };
        if let Some(name) = patch.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(parent) = patch.parent_id {
            project.parent_id = parent;
        }
        project.updated_at = chrono::Utc::now();
        self.commit(Collection::ProjectItems)
    }

    pub fn get_descendant_projects(&self, project_id: &EntityId) -> Vec<&ProjectItem> {
        descendant_projects(&self.project_items, project_id)
    }

    /// Delete a project with its sub-projects and every folder inside them.
    pub fn delete_project_item(&mut self, id: &EntityId) -> DeleteOutcome {
        self.request_deletion(DeletionTarget::Project(id.clone()))
    }

    pub fn force_delete_project_item(&mut self, id: &EntityId) -> WriteOutcome {
        self.resolve_deletion(DeletionTarget::Project(id.clone()), DeleteChoice::DetachSnippets)
    }

    // ---- deletion ----

    /// Everything deleting `target` would remove. `None` if it does not exist.
    pub fn plan_deletion(&self, target: &DeletionTarget) -> Option<DeletionPlan> {
        match target {
            DeletionTarget::Folder(id) => {
                self.folder(id)?;
                Some(DeletionPlan::for_folder(&self.folders, &self.snippets, id))
            }
            DeletionTarget::Project(id) => {
                self.project_item(id)?;
                Some(DeletionPlan::for_project(
                    &self.folders,
                    &self.project_items,
                    &self.snippets,
                    id,
                ))
            }
        }
    }

    fn request_deletion(&mut self, target: DeletionTarget) -> DeleteOutcome {
        let Some(plan) = self.plan_deletion(&target) else {
            return DeleteOutcome::NotFound;
        };
        if plan.has_snippets() {
            debug!(subtree = ?target, snippets = plan.snippet_ids.len(), "deletion needs confirmation");
            return DeleteOutcome::NeedsConfirmation(plan);
        }
        DeleteOutcome::Deleted(self.apply_deletion(&plan, DeleteChoice::DetachSnippets))
    }

    /// Carry out a deletion with an explicit choice for contained snippets.
    /// The plan is recomputed from current state so nothing stale is applied.
    pub fn resolve_deletion(&mut self, target: DeletionTarget, choice: DeleteChoice) -> WriteOutcome {
        match self.plan_deletion(&target) {
            Some(plan) => self.apply_deletion(&plan, choice),
            None => WriteOutcome::Unchanged,
        }
    }

    fn apply_deletion(&mut self, plan: &DeletionPlan, choice: DeleteChoice) -> WriteOutcome {
        let folders = plan.folder_set();
        let projects = plan.project_set();

        info!(
            subtree = ?plan.target,
            folders = folders.len(),
            projects = projects.len(),
            snippets = plan.snippet_ids.len(),
            ?choice,
            "deleting subtree"
        );

        self.folders.retain(|f| !folders.contains(&f.id));
        self.project_items.retain(|p| !projects.contains(&p.id));

        if plan.has_snippets() {
            match choice {
                DeleteChoice::DetachSnippets => {
                    for snippet in self.snippets.iter_mut().filter(|s| plan.snippet_ids.contains(&s.id)) {
                        if snippet.folder_id.as_ref().is_some_and(|id| folders.contains(id)) {
                            snippet.folder_id = None;
                        }
                        if snippet.project_id.as_ref().is_some_and(|id| projects.contains(id)) {
                            snippet.project_id = None;
                        }
                        snippet.touch();
                    }
                }
                DeleteChoice::DeleteSnippets => {
                    self.snippets.retain(|s| !plan.snippet_ids.contains(&s.id));
                    if self
                        .selected_snippet
                        .as_ref()
                        .is_some_and(|id| plan.snippet_ids.contains(id))
                    {
                        self.selected_snippet = None;
                    }
                }
            }
        }
        self.retain_valid_selection();

        let mut outcome = WriteOutcome::Unchanged;
        if !folders.is_empty() {
            outcome = outcome.and(self.commit(Collection::Folders));
        }
        if !projects.is_empty() {
            outcome = outcome.and(self.commit(Collection::ProjectItems));
        }
        if plan.has_snippets() {
            outcome = outcome.and(self.commit(Collection::Snippets));
        }
        outcome
    }

    /// A folder or project that can hold folders.
    fn is_container(&self, id: &EntityId) -> bool {
        self.folder(id).is_some() || self.project_item(id).is_some()
    }
}
