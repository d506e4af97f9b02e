//! Command-line front end over [`SnippetStore`].

pub mod commands;
pub mod tree;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::config::Config;
use crate::models::{FileStore, Storage};
use crate::store::{DeleteChoice, SnippetStore};
use commands::{Destination, NewSnippet};
use tree::TreeRoot;

#[derive(Debug, Clone, Parser)]
#[command(about, version, subcommand_help_heading = "Commands")]
pub struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Directory holding the snippet collections.
    #[arg(long, global = true, value_name = "path")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show projects, folders and snippets as a tree.
    #[command(alias = "ls")]
    List(ListOptions),

    /// Print a snippet with its metadata.
    #[command(alias = "cat")]
    Show { snippet: String },

    /// Fuzzy search over title, description, content and tags.
    #[command(alias = "find")]
    Search { query: String },

    /// List favorite snippets.
    Favorites,

    /// Show snippet statistics.
    Stats,

    /// Add a snippet from --content, --file or stdin.
    Add(AddOptions),

    /// Delete a snippet.
    Rm { snippet: String },

    /// Duplicate a snippet.
    Dup { snippet: String },

    /// Toggle the favorite flag.
    Fav { snippet: String },

    /// Copy a snippet's content to the clipboard.
    Copy { snippet: String },

    /// Move a snippet into a folder or project, or unassign it.
    Mv(MoveOptions),

    /// Manage folders.
    #[command(subcommand)]
    Folder(FolderCommand),

    /// Manage projects.
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Write every collection as JSON to a file or stdout.
    Export {
        #[arg(value_name = "path")]
        path: Option<PathBuf>,
    },

    /// Replace all data with a JSON export.
    Import {
        #[arg(value_name = "path")]
        path: PathBuf,
    },

    /// Clear references to folders and projects that no longer exist.
    Cleanup,
}

#[derive(Debug, Clone, Args)]
pub struct ListOptions {
    /// Only show this folder's subtree.
    #[arg(long, conflicts_with = "project")]
    pub folder: Option<String>,

    /// Only show this project's subtree.
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct AddOptions {
    pub title: String,

    #[arg(short, long, conflicts_with = "file")]
    pub content: Option<String>,

    /// Read content from a file; its extension picks the language.
    #[arg(short, long, value_name = "path")]
    pub file: Option<PathBuf>,

    #[arg(short, long)]
    pub language: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// Comma separated.
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Defaults to the language id.
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, conflicts_with = "project")]
    pub folder: Option<String>,

    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("destination").required(true).args(["folder", "project", "unassign"])))]
pub struct MoveOptions {
    pub snippet: String,

    #[arg(long)]
    pub folder: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    /// Leave the snippet in neither a folder nor a project.
    #[arg(long)]
    pub unassign: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteOptions {
    pub name: String,

    /// Keep contained snippets as unassigned.
    #[arg(long, conflicts_with = "purge")]
    pub detach: bool,

    /// Delete contained snippets as well.
    #[arg(long)]
    pub purge: bool,
}

impl DeleteOptions {
    fn choice(&self) -> Option<DeleteChoice> {
        if self.purge {
            Some(DeleteChoice::DeleteSnippets)
        } else if self.detach {
            Some(DeleteChoice::DetachSnippets)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum FolderCommand {
    /// Create a folder.
    Add {
        name: String,
        /// Parent folder.
        #[arg(long, conflicts_with = "project")]
        parent: Option<String>,
        /// Parent project.
        #[arg(long)]
        project: Option<String>,
    },
    /// Delete a folder and its subfolders.
    Rm(DeleteOptions),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProjectCommand {
    /// Create a project.
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Parent project.
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a project with its sub-projects and folders.
    Rm(DeleteOptions),
}

impl Cli {
    /// Config file merged with environment and command-line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let config = match self.config.clone().or_else(Config::default_path) {
            Some(path) => Config::load(&path)?,
            None => Config::default(),
        };
        let mut config = config.with_env(|key| std::env::var(key).ok());
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        Ok(config)
    }

    pub fn run(self, config: &Config) -> Result<()> {
        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => FileStore::default_dir()?,
        };
        let backend = FileStore::open(&data_dir)
            .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;
        let mut store = SnippetStore::open(Storage::new(backend), config.store_settings());

        let Some(command) = self.command else {
            tree::display_tree(&store, TreeRoot::Everything);
            return Ok(());
        };
        dispatch(&mut store, command)
    }
}

fn dispatch(store: &mut SnippetStore, command: Command) -> Result<()> {
    match command {
        Command::List(opts) => {
            let root = match (opts.folder, opts.project) {
                (Some(folder), _) => TreeRoot::Folder(commands::find_folder(store, &folder)?),
                (None, Some(project)) => TreeRoot::Project(commands::find_project(store, &project)?),
                (None, None) => TreeRoot::Everything,
            };
            tree::display_tree(store, root);
            Ok(())
        }
        Command::Show { snippet } => commands::show_snippet(store, &snippet),
        Command::Search { query } => commands::search_snippets(store, &query),
        Command::Favorites => commands::list_favorites(store),
        Command::Stats => commands::show_stats(store),
        Command::Add(opts) => commands::add_snippet(
            store,
            NewSnippet {
                title: &opts.title,
                content: opts.content.clone(),
                file: opts.file.as_deref(),
                language: opts.language.as_deref(),
                description: opts.description.as_deref(),
                tags: opts.tags.as_deref(),
                category: opts.category.as_deref(),
                folder: opts.folder.as_deref(),
                project: opts.project.as_deref(),
            },
        ),
        Command::Rm { snippet } => commands::remove_snippet(store, &snippet),
        Command::Dup { snippet } => commands::duplicate_snippet(store, &snippet),
        Command::Fav { snippet } => commands::toggle_favorite(store, &snippet),
        Command::Copy { snippet } => commands::copy_snippet(store, &snippet),
        Command::Mv(opts) => {
            let to = match (&opts.folder, &opts.project) {
                (Some(folder), _) => Destination::Folder(folder),
                (None, Some(project)) => Destination::Project(project),
                (None, None) => Destination::Unassigned,
            };
            commands::move_snippet(store, &opts.snippet, to)
        }
        Command::Folder(FolderCommand::Add { name, parent, project }) => {
            commands::add_folder(store, &name, parent.as_deref(), project.as_deref())
        }
        Command::Folder(FolderCommand::Rm(opts)) => commands::remove_folder(store, &opts.name, opts.choice()),
        Command::Project(ProjectCommand::Add {
            name,
            description,
            parent,
        }) => commands::add_project(store, &name, description.as_deref(), parent.as_deref()),
        Command::Project(ProjectCommand::Rm(opts)) => {
            commands::remove_project(store, &opts.name, opts.choice())
        }
        Command::Export { path } => commands::export(store, path.as_deref()),
        Command::Import { path } => commands::import(store, &path),
        Command::Cleanup => commands::cleanup(store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_delete_flags() {
        let cli = Cli::parse_from(["snipvault", "folder", "rm", "Work", "--purge"]);
        let Some(Command::Folder(FolderCommand::Rm(opts))) = cli.command else {
            panic!("expected folder rm");
        };
        assert_eq!(opts.choice(), Some(DeleteChoice::DeleteSnippets));
    }

    #[test]
    fn move_needs_a_destination() {
        assert!(Cli::try_parse_from(["snipvault", "mv", "x"]).is_err());
        assert!(Cli::try_parse_from(["snipvault", "mv", "x", "--unassign"]).is_ok());
        assert!(Cli::try_parse_from(["snipvault", "mv", "x", "--folder", "a", "--unassign"]).is_err());
    }
}
