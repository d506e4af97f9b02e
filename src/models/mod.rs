pub mod export;
pub mod folder;
pub mod id;
pub mod project;
pub mod snippet;
pub mod storage;
pub mod tags;

pub use export::{
    ImportDocument, ImportError, export_json, export_to_file, parse_import, read_import_file,
};
pub use folder::{Folder, FolderPatch};
pub use id::EntityId;
pub use project::{ProjectItem, ProjectPatch};
pub use snippet::{Snippet, SnippetLanguage, SnippetPatch};
pub use storage::{
    Collection, FileStore, KeyValueStore, MemoryStore, Storage, StorageData, StorageError,
};
pub use tags::{Category, Project, Tag, normalize_tags, parse_tag_list};
