//! Referential repair pass, run after loading and after imports.

use std::collections::HashSet;

use tracing::info;

use crate::models::{EntityId, Folder, ProjectItem, Snippet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    /// Snippets whose `folderId` pointed at a missing folder.
    pub cleared_folder_refs: Vec<EntityId>,
    /// Snippets whose `projectId` pointed at a missing project, or that
    /// carried both a folder and a project.
    pub cleared_project_refs: Vec<EntityId>,
    /// Folders whose parent no longer exists; they are now root folders.
    pub rerooted_folders: Vec<EntityId>,
}

impl CleanupReport {
    pub fn has_changes(&self) -> bool {
        self.snippets_changed() || self.folders_changed()
    }

    pub fn snippets_changed(&self) -> bool {
        !self.cleared_folder_refs.is_empty() || !self.cleared_project_refs.is_empty()
    }

    pub fn folders_changed(&self) -> bool {
        !self.rerooted_folders.is_empty()
    }

    pub fn repairs(&self) -> usize {
        self.cleared_folder_refs.len() + self.cleared_project_refs.len() + self.rerooted_folders.len()
    }
}

/// Clear every dangling reference in place and report what changed.
pub fn cleanup_orphans(
    snippets: &mut [Snippet],
    folders: &mut [Folder],
    projects: &[ProjectItem],
) -> CleanupReport {
    let folder_ids: HashSet<EntityId> = folders.iter().map(|f| f.id.clone()).collect();
    let project_ids: HashSet<&EntityId> = projects.iter().map(|p| &p.id).collect();
    let mut report = CleanupReport::default();

    for folder in folders.iter_mut() {
        let Some(parent) = &folder.parent_id else {
            continue;
        };
        if !folder_ids.contains(parent) && !project_ids.contains(parent) {
            info!(folder = %folder.id, name = %folder.name, %parent, "clearing dangling folder parent");
            folder.parent_id = None;
            report.rerooted_folders.push(folder.id.clone());
        }
    }

    for snippet in snippets.iter_mut() {
        if let Some(folder) = snippet.folder_id.take_if(|id| !folder_ids.contains(&*id)) {
            info!(snippet = %snippet.id, title = %snippet.title, %folder, "clearing dangling folder reference");
            report.cleared_folder_refs.push(snippet.id.clone());
        }

        if let Some(project) = &snippet.project_id {
            if !project_ids.contains(project) {
                info!(snippet = %snippet.id, title = %snippet.title, %project, "clearing dangling project reference");
                snippet.project_id = None;
                report.cleared_project_refs.push(snippet.id.clone());
            } else if snippet.folder_id.is_some() {
                info!(snippet = %snippet.id, title = %snippet.title, "snippet had both folder and project, keeping folder");
                snippet.project_id = None;
                report.cleared_project_refs.push(snippet.id.clone());
            }
        }
    }

    report
}
