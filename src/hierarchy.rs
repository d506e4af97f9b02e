//! Traversal over the folder and project forests.
//!
//! Both forests are stored flat, each node pointing at its parent by id. A
//! [`ParentIndex`] resolves children on demand. Every walk carries a visited
//! set, so a parent cycle that slipped in through an import ends the walk
//! instead of looping.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::{EntityId, Folder, ProjectItem, Snippet};

/// A node in a parent-pointer forest.
pub trait TreeNode {
    fn id(&self) -> &EntityId;
    fn parent_id(&self) -> Option<&EntityId>;
}

impl TreeNode for Folder {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn parent_id(&self) -> Option<&EntityId> {
        self.parent_id.as_ref()
    }
}

impl TreeNode for ProjectItem {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn parent_id(&self) -> Option<&EntityId> {
        self.parent_id.as_ref()
    }
}

/// Children lookup for a flat node list, preserving collection order.
pub struct ParentIndex<'a, T> {
    nodes: &'a [T],
    children: HashMap<&'a EntityId, Vec<usize>>,
}

impl<'a, T: TreeNode> ParentIndex<'a, T> {
    pub fn new(nodes: &'a [T]) -> Self {
        let mut children: HashMap<&'a EntityId, Vec<usize>> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            if let Some(parent) = node.parent_id() {
                children.entry(parent).or_default().push(index);
            }
        }
        Self { nodes, children }
    }

    pub fn children(&self, parent: &EntityId) -> impl Iterator<Item = &'a T> + '_ {
        let nodes = self.nodes;
        self.children
            .get(parent)
            .into_iter()
            .flatten()
            .map(move |&index| &nodes[index])
    }

    /// Every node below `root`, depth first, each node before its children.
    pub fn descendants(&self, root: &EntityId) -> Vec<&'a T> {
        let mut out = Vec::new();
        let mut visited: HashSet<&EntityId> = HashSet::from([root]);
        let mut stack: Vec<&'a T> = self.children(root).collect();
        stack.reverse();

        while let Some(node) = stack.pop() {
            if !visited.insert(node.id()) {
                warn!(node = %node.id(), root = %root, "parent cycle detected, stopping descent");
                continue;
            }
            out.push(node);

            let before = stack.len();
            stack.extend(self.children(node.id()));
            stack[before..].reverse();
        }

        out
    }
}

pub fn descendant_folders<'a>(folders: &'a [Folder], folder_id: &EntityId) -> Vec<&'a Folder> {
    ParentIndex::new(folders).descendants(folder_id)
}

pub fn descendant_projects<'a>(projects: &'a [ProjectItem], project_id: &EntityId) -> Vec<&'a ProjectItem> {
    ParentIndex::new(projects).descendants(project_id)
}

/// Would pointing `node` at `new_parent` close a loop? True when the new
/// parent is the node itself or one of its descendants.
pub fn would_create_cycle<T: TreeNode>(nodes: &[T], node: &EntityId, new_parent: &EntityId) -> bool {
    let parents: HashMap<&EntityId, Option<&EntityId>> =
        nodes.iter().map(|n| (n.id(), n.parent_id())).collect();

    let mut visited = HashSet::new();
    let mut current = Some(new_parent);
    while let Some(id) = current {
        if id == node {
            return true;
        }
        if !visited.insert(id) {
            // an existing loop not involving `node`
            return false;
        }
        current = parents.get(id).copied().flatten();
    }
    false
}

/// The nearest project above a folder, following folder parents until one
/// of them is a project.
pub fn owning_project(folders: &[Folder], projects: &[ProjectItem], folder_id: &EntityId) -> Option<EntityId> {
    let project_ids: HashSet<&EntityId> = projects.iter().map(|p| &p.id).collect();
    let folder_parents: HashMap<&EntityId, Option<&EntityId>> =
        folders.iter().map(|f| (&f.id, f.parent_id.as_ref())).collect();

    let mut visited = HashSet::new();
    let mut current = folder_id;
    while visited.insert(current) {
        let parent = folder_parents.get(current).copied().flatten()?;
        if project_ids.contains(parent) {
            return Some(parent.clone());
        }
        current = parent;
    }
    None
}

/// Folders hanging under any of `project_ids`, including folders nested
/// inside those folders.
pub fn folders_under_projects(folders: &[Folder], project_ids: &HashSet<EntityId>) -> Vec<EntityId> {
    let index = ParentIndex::new(folders);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for folder in folders
        .iter()
        .filter(|f| f.parent_id.as_ref().is_some_and(|p| project_ids.contains(p)))
    {
        for id in std::iter::once(&folder.id).chain(index.descendants(&folder.id).iter().map(|f| &f.id)) {
            if seen.insert(id) {
                out.push(id.clone());
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionTarget {
    Folder(EntityId),
    Project(EntityId),
}

/// Everything a hierarchy deletion touches, computed before any write.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionPlan {
    pub target: DeletionTarget,
    /// Folders to remove, target first when the target is a folder.
    pub folder_ids: Vec<EntityId>,
    /// Projects to remove, target first when the target is a project.
    pub project_ids: Vec<EntityId>,
    /// Snippets placed anywhere inside the removed subtree.
    pub snippet_ids: Vec<EntityId>,
}

impl DeletionPlan {
    pub fn for_folder(folders: &[Folder], snippets: &[Snippet], folder_id: &EntityId) -> Self {
        let folder_ids: Vec<EntityId> = std::iter::once(folder_id.clone())
            .chain(descendant_folders(folders, folder_id).iter().map(|f| f.id.clone()))
            .collect();

        let removed: HashSet<&EntityId> = folder_ids.iter().collect();
        let snippet_ids = snippets
            .iter()
            .filter(|s| s.folder_id.as_ref().is_some_and(|id| removed.contains(id)))
            .map(|s| s.id.clone())
            .collect();

        Self {
            target: DeletionTarget::Folder(folder_id.clone()),
            folder_ids,
            project_ids: Vec::new(),
            snippet_ids,
        }
    }

    pub fn for_project(
        folders: &[Folder],
        projects: &[ProjectItem],
        snippets: &[Snippet],
        project_id: &EntityId,
    ) -> Self {
        let project_ids: Vec<EntityId> = std::iter::once(project_id.clone())
            .chain(descendant_projects(projects, project_id).iter().map(|p| p.id.clone()))
            .collect();

        let removed_projects: HashSet<EntityId> = project_ids.iter().cloned().collect();
        let folder_ids = folders_under_projects(folders, &removed_projects);
        let removed_folders: HashSet<&EntityId> = folder_ids.iter().collect();

        let snippet_ids = snippets
            .iter()
            .filter(|s| {
                s.project_id.as_ref().is_some_and(|id| removed_projects.contains(id))
                    || s.folder_id.as_ref().is_some_and(|id| removed_folders.contains(id))
            })
            .map(|s| s.id.clone())
            .collect();

        Self {
            target: DeletionTarget::Project(project_id.clone()),
            folder_ids,
            project_ids,
            snippet_ids,
        }
    }

    pub fn has_snippets(&self) -> bool {
        !self.snippet_ids.is_empty()
    }

    pub fn folder_set(&self) -> HashSet<EntityId> {
        self.folder_ids.iter().cloned().collect()
    }

    pub fn project_set(&self) -> HashSet<EntityId> {
        self.project_ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnippetLanguage;
    use pretty_assertions::assert_eq;

    fn names<'a>(nodes: impl IntoIterator<Item = &'a Folder>) -> Vec<&'a str> {
        nodes.into_iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn descendants_are_pre_order_in_collection_order() {
        let root = Folder::new("root");
        let a = Folder::new_with_parent("a", root.id.clone());
        let b = Folder::new_with_parent("b", root.id.clone());
        let a1 = Folder::new_with_parent("a1", a.id.clone());
        let b1 = Folder::new_with_parent("b1", b.id.clone());
        let a2 = Folder::new_with_parent("a2", a.id.clone());
        let folders = vec![root.clone(), a, b, a1, b1, a2];

        assert_eq!(
            names(descendant_folders(&folders, &root.id)),
            vec!["a", "a1", "a2", "b", "b1"]
        );
        assert!(descendant_folders(&folders, &EntityId::new()).is_empty());
    }

    #[test]
    fn descent_terminates_on_cycles() {
        let mut x = Folder::new("x");
        let y = Folder::new_with_parent("y", x.id.clone());
        x.parent_id = Some(y.id.clone());
        let folders = vec![x.clone(), y];

        assert_eq!(names(descendant_folders(&folders, &x.id)), vec!["y"]);
    }

    #[test]
    fn detects_reparenting_cycles() {
        let a = Folder::new("a");
        let b = Folder::new_with_parent("b", a.id.clone());
        let c = Folder::new_with_parent("c", b.id.clone());
        let other = Folder::new("other");
        let folders = vec![a.clone(), b.clone(), c.clone(), other.clone()];

        assert!(would_create_cycle(&folders, &a.id, &a.id));
        assert!(would_create_cycle(&folders, &a.id, &c.id));
        assert!(!would_create_cycle(&folders, &c.id, &other.id));
        assert!(!would_create_cycle(&folders, &b.id, &a.id));
    }

    #[test]
    fn owning_project_follows_nested_folders() {
        let project = ProjectItem::new("Site", None);
        let top = Folder::new_with_parent("src", project.id.clone());
        let nested = Folder::new_with_parent("components", top.id.clone());
        let loose = Folder::new("loose");
        let folders = vec![top, nested.clone(), loose.clone()];
        let projects = vec![project.clone()];

        assert_eq!(owning_project(&folders, &projects, &nested.id), Some(project.id.clone()));
        assert_eq!(owning_project(&folders, &projects, &loose.id), None);
    }

    #[test]
    fn project_plan_covers_sub_projects_folders_and_snippets() {
        let project = ProjectItem::new("App", None);
        let sub = ProjectItem::new_with_parent("Api", None, project.id.clone());
        let unrelated = ProjectItem::new("Other", None);
        let folder = Folder::new_with_parent("handlers", sub.id.clone());
        let nested = Folder::new_with_parent("auth", folder.id.clone());
        let free = Folder::new("free");

        let in_nested = Snippet::new("login", "", SnippetLanguage::Rust).in_folder(nested.id.clone());
        let direct = Snippet::new("readme", "", SnippetLanguage::Markdown).in_project(project.id.clone());
        let outside = Snippet::new("misc", "", SnippetLanguage::Text).in_folder(free.id.clone());

        let folders = vec![folder.clone(), nested.clone(), free];
        let projects = vec![project.clone(), sub.clone(), unrelated];
        let snippets = vec![in_nested.clone(), direct.clone(), outside];

        let plan = DeletionPlan::for_project(&folders, &projects, &snippets, &project.id);
        assert_eq!(plan.project_ids, vec![project.id, sub.id]);
        assert_eq!(plan.folder_ids, vec![folder.id, nested.id]);
        assert_eq!(plan.snippet_ids, vec![in_nested.id, direct.id]);
        assert!(plan.has_snippets());
    }
}
