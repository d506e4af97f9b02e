use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::clipboard::SystemClipboard;
use crate::hierarchy::{DeletionPlan, DeletionTarget};
use crate::models::{
    EntityId, Snippet, SnippetLanguage, export_to_file, parse_tag_list, read_import_file,
};
use crate::search::SearchResult;
use crate::store::{DeleteChoice, DeleteOutcome, ImportOutcome, SnippetStore, WriteOutcome};

/// Find an entity by id, then exact name, then partial name, ignoring case.
fn resolve<'a, T>(
    items: &'a [T],
    query: &str,
    id: impl Fn(&T) -> &EntityId,
    name: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    if let Some(item) = items.iter().find(|item| id(item).as_str() == query) {
        return Some(item);
    }
    let needle = query.to_lowercase();
    items
        .iter()
        .find(|item| name(item).to_lowercase() == needle)
        .or_else(|| items.iter().find(|item| name(item).to_lowercase().contains(&needle)))
}

pub fn find_snippet(store: &SnippetStore, query: &str) -> Result<EntityId> {
    if let Some(snippet) = resolve(store.snippets(), query, |s| &s.id, |s| s.title.as_str()) {
        return Ok(snippet.id.clone());
    }

    println!("{}  Available snippets:", "┃".bright_magenta());
    println!("{}", "─".repeat(60).bright_magenta());
    for (idx, snippet) in store.snippets().iter().enumerate().take(10) {
        println!(
            "{}  {}. {}",
            "┃".bright_magenta(),
            (idx + 1).to_string().yellow(),
            snippet.title.bright_white()
        );
    }
    if store.snippets().len() > 10 {
        println!("{}  ... and {} more", "┃".bright_magenta(), store.snippets().len() - 10);
    }
    bail!("no snippet found matching {query:?}")
}

pub fn find_folder(store: &SnippetStore, query: &str) -> Result<EntityId> {
    resolve(store.folders(), query, |f| &f.id, |f| f.name.as_str())
        .map(|f| f.id.clone())
        .with_context(|| format!("no folder found matching {query:?}"))
}

pub fn find_project(store: &SnippetStore, query: &str) -> Result<EntityId> {
    resolve(store.project_items(), query, |p| &p.id, |p| p.name.as_str())
        .map(|p| p.id.clone())
        .with_context(|| format!("no project found matching {query:?}"))
}

/// Warn when a change stayed in memory only.
fn report_write(outcome: WriteOutcome, what: &str) -> Result<()> {
    match outcome {
        WriteOutcome::Saved => {
            println!("{}  {}", "┃".bright_magenta(), what.bright_green());
            Ok(())
        }
        WriteOutcome::Unsaved => bail!("{what}, but the change could not be saved"),
        WriteOutcome::Unchanged => {
            println!("{}  Nothing to change", "┃".bright_magenta());
            Ok(())
        }
        WriteOutcome::Rejected => bail!("refused: the change would leave the hierarchy invalid"),
    }
}

// ---- display ----

pub fn show_snippet(store: &SnippetStore, query: &str) -> Result<()> {
    let id = find_snippet(store, query)?;
    let Some(snippet) = store.snippet(&id) else {
        bail!("snippet {id} disappeared");
    };

    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "SNIPPET".bright_green().bold(),
        snippet.title.bold()
    );
    println!("{}", "─".repeat(60).bright_magenta());
    println!("{}  {}: {}", "┃".bright_magenta(), "Path".bright_magenta(), snippet_path(store, snippet));
    println!(
        "{}  {}: {}",
        "┃".bright_magenta(),
        "Language".bright_yellow(),
        snippet.language.display_name()
    );
    if !snippet.description.is_empty() {
        println!("{}  {}: {}", "┃".bright_magenta(), "Description".bright_cyan(), snippet.description);
    }
    if !snippet.tags.is_empty() {
        println!("{}  {}: {}", "┃".bright_magenta(), "Tags".bright_blue(), snippet.tags.join(", "));
    }
    println!(
        "{}  {}: {} (last {})",
        "┃".bright_magenta(),
        "Used".bright_white(),
        snippet.usage_count,
        snippet
            .last_used
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| String::from("never"))
    );
    println!("{}  {}: {}", "┃".bright_magenta(), "ID".bright_black(), snippet.id);
    println!("{}", "─".repeat(60).bright_magenta());

    for line in snippet.content.lines() {
        println!("{}  {}", "┃".bright_magenta(), line);
    }
    Ok(())
}

/// `project/folder/.../title`, following folder and project parents.
fn snippet_path(store: &SnippetStore, snippet: &Snippet) -> String {
    let mut parts = vec![snippet.title.clone()];
    let mut current = snippet.folder_id.as_ref().or(snippet.project_id.as_ref());
    let mut seen = Vec::new();

    while let Some(id) = current {
        if seen.contains(&id) {
            break;
        }
        seen.push(id);
        if let Some(folder) = store.folder(id) {
            parts.push(folder.name.clone());
            current = folder.parent_id.as_ref();
        } else if let Some(project) = store.project_item(id) {
            parts.push(project.name.clone());
            current = project.parent_id.as_ref();
        } else {
            break;
        }
    }

    parts.reverse();
    parts.join("/")
}

pub fn search_snippets(store: &SnippetStore, query: &str) -> Result<()> {
    let results = store.search(query);
    if results.is_empty() {
        println!("{}  No snippets found matching: {}", "┃".bright_magenta(), query);
        return Ok(());
    }

    println!(
        "{}  {} results for: {}",
        "┃".bright_magenta(),
        results.len().to_string().bright_green(),
        query.bright_white()
    );
    println!("{}", "─".repeat(60).bright_magenta());
    for (idx, result) in results.iter().enumerate() {
        print_search_result(idx, result);
    }
    Ok(())
}

fn print_search_result(idx: usize, result: &SearchResult) {
    let fields: Vec<&str> = result.matched_fields().map(|f| f.name()).collect();
    println!(
        "{}  {}. {} [{}] {} {}",
        "┃".bright_magenta(),
        (idx + 1).to_string().yellow(),
        result.snippet.title.bright_white(),
        result.snippet.language.short_name().bright_black(),
        format!("({})", fields.join(", ")).bright_black(),
        format!("{:.3}", result.score).bright_black()
    );
}

pub fn list_favorites(store: &SnippetStore) -> Result<()> {
    let favorites = store.favorite_snippets();
    if favorites.is_empty() {
        println!("{}  No favorite snippets yet", "┃".bright_magenta());
        return Ok(());
    }

    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "FAVORITES".bright_yellow().bold(),
        format!("({})", favorites.len()).bright_black()
    );
    println!("{}", "─".repeat(60).bright_magenta());
    for snippet in favorites {
        println!(
            "{}  {} {} [{}] {}",
            "┃".bright_magenta(),
            "★".yellow(),
            snippet.title.bright_white(),
            snippet.language.short_name().bright_black(),
            snippet_path(store, snippet).bright_black().italic()
        );
    }
    Ok(())
}

pub fn show_stats(store: &SnippetStore) -> Result<()> {
    let counts = store.counts();
    let row = |label: &str, value: usize| {
        println!("{}  {:<20} {}", "┃".bright_magenta(), label.bright_white(), value);
    };

    println!("{}  {}", "┃".bright_magenta(), "STATISTICS".bright_green().bold());
    println!("{}", "─".repeat(60).bright_magenta());
    row("Snippets", counts.total_snippets);
    row("Favorites", counts.favorites);
    row("Unassigned", counts.unassigned);
    row("Untagged", counts.untagged);
    row("Uncategorized", counts.uncategorized);
    row("Recently modified", counts.recently_modified);
    row("Used at least once", counts.most_used);
    row("Folders", store.folders().len());
    row("Projects", store.project_items().len());

    if !counts.language_counts.is_empty() {
        println!("{}  {}", "┃".bright_magenta(), "LANGUAGES".bright_yellow());
        for (language, count) in &counts.language_counts {
            let name = SnippetLanguage::from_id(language);
            row(name.display_name(), *count);
        }
    }
    if !counts.tag_counts.is_empty() {
        println!("{}  {}", "┃".bright_magenta(), "TAGS".bright_yellow());
        for (tag, count) in &counts.tag_counts {
            row(&format!("#{tag}"), *count);
        }
    }
    Ok(())
}

// ---- snippet mutations ----

pub struct NewSnippet<'a> {
    pub title: &'a str,
    pub content: Option<String>,
    pub file: Option<&'a Path>,
    pub language: Option<&'a str>,
    pub description: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub category: Option<&'a str>,
    pub folder: Option<&'a str>,
    pub project: Option<&'a str>,
}

pub fn add_snippet(store: &mut SnippetStore, new: NewSnippet<'_>) -> Result<()> {
    if new.title.trim().is_empty() {
        bail!("snippet title is empty");
    }

    let content = match (new.content, new.file) {
        (Some(content), _) => content,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read snippet content from stdin")?;
            buffer
        }
    };

    let language = match (new.language, new.file) {
        (Some(language), _) => SnippetLanguage::parse_lenient(language),
        (None, Some(path)) => SnippetLanguage::from_path(path),
        (None, None) => SnippetLanguage::default(),
    };

    let mut snippet = Snippet::new(new.title.trim(), content, language);
    if let Some(description) = new.description {
        snippet = snippet.with_description(description);
    }
    if let Some(tags) = new.tags {
        snippet = snippet.with_tags(parse_tag_list(tags));
    }
    if let Some(category) = new.category {
        snippet = snippet.with_category(category.trim());
    }

    // resolve the destination before anything is written
    let destination = match (new.folder, new.project) {
        (Some(folder), _) => Some(Placement::Folder(find_folder(store, folder)?)),
        (None, Some(project)) => Some(Placement::Project(find_project(store, project)?)),
        (None, None) => None,
    };

    let id = snippet.id.clone();
    report_write(store.add_snippet(snippet), "Snippet added")?;

    // placement goes through the move operations so project rules apply
    match destination {
        Some(Placement::Folder(folder)) => {
            report_write(store.move_snippet_to_folder(&id, Some(&folder)), "Placed in folder")?;
        }
        Some(Placement::Project(project)) => {
            report_write(store.move_snippet_to_project(&id, Some(&project)), "Placed in project")?;
        }
        None => {}
    }

    println!("{}  {}: {}", "┃".bright_magenta(), "ID".bright_black(), id);
    Ok(())
}

enum Placement {
    Folder(EntityId),
    Project(EntityId),
}

pub fn remove_snippet(store: &mut SnippetStore, query: &str) -> Result<()> {
    let id = find_snippet(store, query)?;
    report_write(store.delete_snippet(&id), "Snippet deleted")
}

pub fn duplicate_snippet(store: &mut SnippetStore, query: &str) -> Result<()> {
    let id = find_snippet(store, query)?;
    let copy = store
        .duplicate_snippet(&id)
        .with_context(|| format!("snippet {id} disappeared"))?;
    println!(
        "{}  {} {} ({})",
        "┃".bright_magenta(),
        "Created".bright_green(),
        copy.title.bright_white(),
        copy.id.as_str().bright_black()
    );
    Ok(())
}

pub fn toggle_favorite(store: &mut SnippetStore, query: &str) -> Result<()> {
    let id = find_snippet(store, query)?;
    store.toggle_favorite(&id);
    let favorite = store.snippet(&id).is_some_and(|s| s.favorite);
    let message = if favorite { "Added to favorites" } else { "Removed from favorites" };
    println!("{}  {}", "┃".bright_magenta(), message.bright_yellow());
    Ok(())
}

pub fn copy_snippet(store: &mut SnippetStore, query: &str) -> Result<()> {
    let id = find_snippet(store, query)?;
    if !store.copy_snippet(&id, &mut SystemClipboard) {
        bail!("could not copy to the clipboard (is wl-copy, xclip or pbcopy installed?)");
    }
    println!("{}  {}", "┃".bright_magenta(), "Copied to clipboard".bright_green());
    Ok(())
}

pub enum Destination<'a> {
    Folder(&'a str),
    Project(&'a str),
    Unassigned,
}

pub fn move_snippet(store: &mut SnippetStore, query: &str, to: Destination<'_>) -> Result<()> {
    let id = find_snippet(store, query)?;
    let outcome = match to {
        Destination::Folder(folder) => {
            let folder = find_folder(store, folder)?;
            store.move_snippet_to_folder(&id, Some(&folder))
        }
        Destination::Project(project) => {
            let project = find_project(store, project)?;
            store.move_snippet_to_project(&id, Some(&project))
        }
        Destination::Unassigned => store.move_snippet_to_folder(&id, None),
    };
    report_write(outcome, "Snippet moved")
}

// ---- hierarchy ----

pub fn add_folder(store: &mut SnippetStore, name: &str, parent: Option<&str>, project: Option<&str>) -> Result<()> {
    let parent = match (parent, project) {
        (Some(folder), _) => Some(find_folder(store, folder)?),
        (None, Some(project)) => Some(find_project(store, project)?),
        (None, None) => None,
    };
    let id = store
        .add_folder(name, parent.as_ref())
        .context("folder name must not be empty")?;
    println!("{}  {} {}", "┃".bright_magenta(), "Folder created".bright_green(), id.as_str().bright_black());
    Ok(())
}

pub fn add_project(store: &mut SnippetStore, name: &str, description: Option<&str>, parent: Option<&str>) -> Result<()> {
    let parent = parent.map(|p| find_project(store, p)).transpose()?;
    let id = store
        .add_project_item(name, description, parent.as_ref())
        .context("project name must not be empty")?;
    println!("{}  {} {}", "┃".bright_magenta(), "Project created".bright_green(), id.as_str().bright_black());
    Ok(())
}

pub fn remove_folder(store: &mut SnippetStore, query: &str, choice: Option<DeleteChoice>) -> Result<()> {
    let id = find_folder(store, query)?;
    delete_subtree(store, DeletionTarget::Folder(id), choice)
}

pub fn remove_project(store: &mut SnippetStore, query: &str, choice: Option<DeleteChoice>) -> Result<()> {
    let id = find_project(store, query)?;
    delete_subtree(store, DeletionTarget::Project(id), choice)
}

fn delete_subtree(store: &mut SnippetStore, target: DeletionTarget, choice: Option<DeleteChoice>) -> Result<()> {
    if let Some(choice) = choice {
        return report_write(store.resolve_deletion(target, choice), "Deleted");
    }

    let outcome = match &target {
        DeletionTarget::Folder(id) => store.delete_folder(id),
        DeletionTarget::Project(id) => store.delete_project_item(id),
    };
    match outcome {
        DeleteOutcome::Deleted(outcome) => report_write(outcome, "Deleted"),
        DeleteOutcome::NotFound => bail!("nothing to delete"),
        DeleteOutcome::NeedsConfirmation(plan) => {
            print_plan(store, &plan);
            Ok(())
        }
    }
}

fn print_plan(store: &SnippetStore, plan: &DeletionPlan) {
    println!(
        "{}  {} this would remove {} folder(s) and {} project(s) holding {} snippet(s):",
        "┃".bright_magenta(),
        "NOT DELETED".bright_red().bold(),
        plan.folder_ids.len(),
        plan.project_ids.len(),
        plan.snippet_ids.len()
    );
    for snippet in plan.snippet_ids.iter().filter_map(|id| store.snippet(id)) {
        println!("{}    {}", "┃".bright_magenta(), snippet.title.bright_white());
    }
    println!(
        "{}  Re-run with {} to keep the snippets unassigned, or {} to delete them too",
        "┃".bright_magenta(),
        "--detach".bright_white(),
        "--purge".bright_white()
    );
}

// ---- data ----

pub fn export(store: &SnippetStore, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            export_to_file(&store.data(), path)?;
            println!(
                "{}  {} {}",
                "┃".bright_magenta(),
                "Exported to".bright_green(),
                path.display()
            );
        }
        None => println!("{}", store.export_data().context("failed to serialize export")?),
    }
    Ok(())
}

pub fn import(store: &mut SnippetStore, path: &Path) -> Result<()> {
    let json = read_import_file(path)?;
    match store.import_data(&json) {
        ImportOutcome::Imported {
            snippets,
            skipped,
            persisted,
            cleanup,
        } => {
            println!(
                "{}  {} {} snippets",
                "┃".bright_magenta(),
                "Imported".bright_green(),
                snippets
            );
            if skipped > 0 {
                println!(
                    "{}  {} {} unreadable entr{}",
                    "┃".bright_magenta(),
                    "Skipped".bright_yellow(),
                    skipped,
                    if skipped == 1 { "y" } else { "ies" }
                );
            }
            if cleanup.has_changes() {
                println!("{}  Repaired {} dangling reference(s)", "┃".bright_magenta(), cleanup.repairs());
            }
            if !persisted {
                bail!("import loaded but could not be saved");
            }
            Ok(())
        }
        ImportOutcome::Rejected(err) => {
            Err(err).with_context(|| format!("{} is not a valid export", path.display()))
        }
    }
}

pub fn cleanup(store: &mut SnippetStore) -> Result<()> {
    let report = store.cleanup_orphaned_data();
    if report.has_changes() {
        println!(
            "{}  {} {} dangling reference(s)",
            "┃".bright_magenta(),
            "Repaired".bright_green(),
            report.repairs()
        );
    } else {
        println!("{}  Everything is consistent", "┃".bright_magenta());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn add(store: &mut SnippetStore, snippet: Snippet) -> EntityId {
        let id = snippet.id.clone();
        store.add_snippet(snippet);
        id
    }

    fn new_snippet<'a>(title: &'a str, folder: Option<&'a str>) -> NewSnippet<'a> {
        NewSnippet {
            title,
            content: Some(String::from("echo hi")),
            file: None,
            language: Some("sh"),
            description: None,
            tags: None,
            category: None,
            folder,
            project: None,
        }
    }

    #[test]
    fn resolves_by_id_then_exact_then_partial() {
        let mut store = SnippetStore::in_memory();
        let longer_id = add(&mut store, Snippet::new("git rebase", "", SnippetLanguage::Bash));
        let exact_id = add(&mut store, Snippet::new("git", "", SnippetLanguage::Bash));

        assert_eq!(find_snippet(&store, "GIT").unwrap(), exact_id);
        assert_eq!(find_snippet(&store, "rebase").unwrap(), longer_id);
        assert_eq!(find_snippet(&store, longer_id.as_str()).unwrap(), longer_id);
        assert!(find_snippet(&store, "missing").is_err());
    }

    #[test]
    fn resolves_free_form_ids() {
        let mut store = SnippetStore::in_memory();
        let mut snippet = Snippet::new("curl", "", SnippetLanguage::Bash);
        snippet.id = EntityId::from("snippet-1712345678901");
        store.add_snippet(snippet);

        assert_eq!(
            find_snippet(&store, "snippet-1712345678901").unwrap(),
            EntityId::from("snippet-1712345678901")
        );
    }

    #[test]
    fn paths_follow_folders_into_projects() {
        let mut store = SnippetStore::in_memory();
        let project = store.add_project_item("Site", None, None).unwrap();
        let folder = store.add_folder("css", Some(&project)).unwrap();
        let snippet = Snippet::new("reset", "", SnippetLanguage::CSS).in_folder(folder);
        store.add_snippet(snippet.clone());

        assert_eq!(snippet_path(&store, &snippet), "Site/css/reset");
    }

    #[test]
    fn add_with_unknown_folder_writes_nothing() {
        let mut store = SnippetStore::in_memory();
        store.add_folder("Work", None).unwrap();

        assert!(add_snippet(&mut store, new_snippet("greet", Some("nowhere"))).is_err());
        assert!(store.snippets().is_empty());

        add_snippet(&mut store, new_snippet("greet", Some("work"))).unwrap();
        assert_eq!(store.snippets().len(), 1);
        assert_eq!(store.snippets()[0].language, SnippetLanguage::Bash);
        assert_eq!(store.snippets()[0].folder_id, Some(store.folders()[0].id.clone()));
    }

    #[test]
    fn unconfirmed_delete_changes_nothing() {
        let mut store = SnippetStore::in_memory();
        let folder = store.add_folder("Work", None).unwrap();
        store.add_snippet(Snippet::new("a", "", SnippetLanguage::Text).in_folder(folder));

        remove_folder(&mut store, "work", None).unwrap();
        assert_eq!(store.folders().len(), 1);

        remove_folder(&mut store, "work", Some(DeleteChoice::DetachSnippets)).unwrap();
        assert!(store.folders().is_empty());
        assert!(store.snippets()[0].is_unassigned());
    }
}
