use colored::Colorize;

use crate::hierarchy::ParentIndex;
use crate::models::{EntityId, Folder, ProjectItem, Snippet};
use crate::store::SnippetStore;

/// Where a listing starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeRoot {
    Everything,
    Folder(EntityId),
    Project(EntityId),
}

/// Displays projects, folders and snippets in a tree-like structure
pub fn display_tree(store: &SnippetStore, root: TreeRoot) {
    let tree = Tree::new(store);

    match root {
        TreeRoot::Folder(id) => {
            if let Some(folder) = store.folder(&id) {
                print_folder_header(folder);
                tree.print_contents(&folder.id, &folder.name);
            }
        }
        TreeRoot::Project(id) => {
            if let Some(project) = store.project_item(&id) {
                print_project_header(project);
                tree.print_contents(&project.id, &project.name);
            }
        }
        TreeRoot::Everything => {
            if store.snippets().is_empty() && store.folders().is_empty() && store.project_items().is_empty() {
                println!("{}  Nothing stored yet.", "┃".bright_magenta());
                return;
            }

            for project in store.project_items().iter().filter(|p| p.parent_id.is_none()) {
                print_project_header(project);
                tree.print_contents(&project.id, &project.name);
            }
            for folder in store.folders().iter().filter(|f| f.parent_id.is_none()) {
                print_folder_header(folder);
                tree.print_contents(&folder.id, &folder.name);
            }

            let unassigned = store.unassigned_snippets();
            if !unassigned.is_empty() {
                println!("{}  {} {}", "┃".bright_magenta(), "○".bright_black(), "Unassigned".bold());
                let count = unassigned.len();
                for (i, snippet) in unassigned.into_iter().enumerate() {
                    print_guides(&[]);
                    print_connector(i == count - 1);
                    print_snippet(snippet, "");
                }
            }
        }
    }
}

fn print_project_header(project: &ProjectItem) {
    println!("{}  {} {}", "┃".bright_magenta(), "◆".bright_cyan(), project.name.bold());
}

fn print_folder_header(folder: &Folder) {
    println!("{}  {} {}", "┃".bright_magenta(), "▸".bright_blue(), folder.name.bold());
}

#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    Snippet(&'a Snippet),
    Project(&'a ProjectItem),
    Folder(&'a Folder),
}

/// One printed line. For snippets `path` is the containing path, for
/// containers it includes the container's own name.
#[derive(Debug)]
struct Row<'a> {
    guides: Vec<bool>,
    is_last: bool,
    path: String,
    node: Node<'a>,
}

/// Folders and projects share one id space, so a single walk handles both.
struct Tree<'a> {
    snippets: &'a [Snippet],
    folders: ParentIndex<'a, Folder>,
    projects: ParentIndex<'a, ProjectItem>,
}

impl<'a> Tree<'a> {
    fn new(store: &'a SnippetStore) -> Self {
        Self {
            snippets: store.snippets(),
            folders: ParentIndex::new(store.folders()),
            projects: ParentIndex::new(store.project_items()),
        }
    }

    fn print_contents(&self, parent: &'a EntityId, path: &str) {
        for row in self.rows(parent, path) {
            print_guides(&row.guides);
            print_connector(row.is_last);
            match row.node {
                Node::Snippet(snippet) => print_snippet(snippet, &row.path),
                Node::Project(project) => print_container("◆".bright_cyan(), &project.name, &row.path),
                Node::Folder(folder) => print_container("▸".bright_blue(), &folder.name, &row.path),
            }
        }
    }

    fn rows(&self, parent: &'a EntityId, path: &str) -> Vec<Row<'a>> {
        let mut rows = Vec::new();
        self.walk(parent, path, &[], &mut vec![parent], &mut rows);
        rows
    }

    fn walk(
        &self,
        parent: &'a EntityId,
        path: &str,
        guides: &[bool],
        trail: &mut Vec<&'a EntityId>,
        rows: &mut Vec<Row<'a>>,
    ) {
        let snippets: Vec<&Snippet> = self
            .snippets
            .iter()
            .filter(|s| s.folder_id.as_ref() == Some(parent) || s.project_id.as_ref() == Some(parent))
            .collect();

        // children already on the trail close a parent cycle from imported data
        let containers: Vec<(&'a EntityId, &'a str, Node<'a>)> = self
            .projects
            .children(parent)
            .map(|p| (&p.id, p.name.as_str(), Node::Project(p)))
            .chain(
                self.folders
                    .children(parent)
                    .map(|f| (&f.id, f.name.as_str(), Node::Folder(f))),
            )
            .filter(|(id, _, _)| !trail.contains(id))
            .collect();

        for (i, &snippet) in snippets.iter().enumerate() {
            rows.push(Row {
                guides: guides.to_vec(),
                is_last: i == snippets.len() - 1 && containers.is_empty(),
                path: path.to_string(),
                node: Node::Snippet(snippet),
            });
        }

        for (i, &(id, name, node)) in containers.iter().enumerate() {
            let is_last = i == containers.len() - 1;
            let child_path = format!("{path}/{name}");
            rows.push(Row {
                guides: guides.to_vec(),
                is_last,
                path: child_path.clone(),
                node,
            });

            let mut next_guides = guides.to_vec();
            next_guides.push(!is_last);
            trail.push(id);
            self.walk(id, &child_path, &next_guides, trail, rows);
            trail.pop();
        }
    }
}

fn print_guides(guides: &[bool]) {
    print!("{}  ", "┃".bright_magenta());
    for guide in guides {
        if *guide {
            print!("┃  ");
        } else {
            print!("   ");
        }
    }
}

fn print_connector(is_last: bool) {
    if is_last {
        print!("└── ");
    } else {
        print!("├── ");
    }
}

fn print_container(icon: colored::ColoredString, name: &str, path: &str) {
    println!("{} {} {}", icon, name.bold(), path.bright_black().italic());
}

fn print_snippet(snippet: &Snippet, path: &str) {
    let star = if snippet.favorite { "★ ".yellow() } else { "".normal() };
    let full_path = if path.is_empty() {
        snippet.title.clone()
    } else {
        format!("{}/{}", path, snippet.title)
    };
    println!(
        "{}{} [{}] {}",
        star,
        snippet.title.bright_white(),
        snippet.language.short_name().bright_black(),
        full_path.bright_black().italic()
    );
}
