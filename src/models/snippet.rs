use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

use crate::models::id::EntityId;
use crate::models::tags::normalize_tags;

const DUPLICATE_TITLE_PREFIX: &str = "Copy of ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub language: SnippetLanguage,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Legacy language label kept for older exports.
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "usage_count", default)]
    pub usage_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SnippetLanguage {
    Rust,
    JavaScript,
    TypeScript,
    Python,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    PHP,
    Ruby,
    Swift,
    Kotlin,
    Dart,
    HTML,
    CSS,
    SCSS,
    SQL,
    Bash,
    PowerShell,
    Yaml,
    Json,
    Xml,
    Markdown,
    Dockerfile,
    Toml,
    Ini,
    Config,
    #[default]
    Text,
    Other(String),
}

impl SnippetLanguage {
    pub const KNOWN: [SnippetLanguage; 29] = [
        SnippetLanguage::Rust,
        SnippetLanguage::JavaScript,
        SnippetLanguage::TypeScript,
        SnippetLanguage::Python,
        SnippetLanguage::Go,
        SnippetLanguage::Java,
        SnippetLanguage::C,
        SnippetLanguage::Cpp,
        SnippetLanguage::CSharp,
        SnippetLanguage::PHP,
        SnippetLanguage::Ruby,
        SnippetLanguage::Swift,
        SnippetLanguage::Kotlin,
        SnippetLanguage::Dart,
        SnippetLanguage::HTML,
        SnippetLanguage::CSS,
        SnippetLanguage::SCSS,
        SnippetLanguage::SQL,
        SnippetLanguage::Bash,
        SnippetLanguage::PowerShell,
        SnippetLanguage::Yaml,
        SnippetLanguage::Json,
        SnippetLanguage::Xml,
        SnippetLanguage::Markdown,
        SnippetLanguage::Dockerfile,
        SnippetLanguage::Toml,
        SnippetLanguage::Ini,
        SnippetLanguage::Config,
        SnippetLanguage::Text,
    ];

    /// Canonical identifier, used as the stored representation.
    pub fn id(&self) -> &str {
        match self {
            SnippetLanguage::Rust => "rust",
            SnippetLanguage::JavaScript => "javascript",
            SnippetLanguage::TypeScript => "typescript",
            SnippetLanguage::Python => "python",
            SnippetLanguage::Go => "go",
            SnippetLanguage::Java => "java",
            SnippetLanguage::C => "c",
            SnippetLanguage::Cpp => "cpp",
            SnippetLanguage::CSharp => "csharp",
            SnippetLanguage::PHP => "php",
            SnippetLanguage::Ruby => "ruby",
            SnippetLanguage::Swift => "swift",
            SnippetLanguage::Kotlin => "kotlin",
            SnippetLanguage::Dart => "dart",
            SnippetLanguage::HTML => "html",
            SnippetLanguage::CSS => "css",
            SnippetLanguage::SCSS => "scss",
            SnippetLanguage::SQL => "sql",
            SnippetLanguage::Bash => "bash",
            SnippetLanguage::PowerShell => "powershell",
            SnippetLanguage::Yaml => "yaml",
            SnippetLanguage::Json => "json",
            SnippetLanguage::Xml => "xml",
            SnippetLanguage::Markdown => "markdown",
            SnippetLanguage::Dockerfile => "dockerfile",
            SnippetLanguage::Toml => "toml",
            SnippetLanguage::Ini => "ini",
            SnippetLanguage::Config => "config",
            SnippetLanguage::Text => "text",
            SnippetLanguage::Other(name) => name,
        }
    }

    /// Exact inverse of [`SnippetLanguage::id`]. Anything else is kept verbatim
    /// as `Other` so stored values survive a load/save cycle unchanged.
    pub fn from_id(id: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|language| language.id() == id)
            .cloned()
            .unwrap_or_else(|| SnippetLanguage::Other(id.to_string()))
    }

    /// Get language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => SnippetLanguage::Rust,
            "js" | "mjs" | "cjs" | "jsx" => SnippetLanguage::JavaScript,
            "ts" | "tsx" => SnippetLanguage::TypeScript,
            "py" => SnippetLanguage::Python,
            "go" => SnippetLanguage::Go,
            "java" => SnippetLanguage::Java,
            "c" | "h" => SnippetLanguage::C,
            "cpp" | "cc" | "cxx" | "hpp" => SnippetLanguage::Cpp,
            "cs" => SnippetLanguage::CSharp,
            "php" => SnippetLanguage::PHP,
            "rb" => SnippetLanguage::Ruby,
            "swift" => SnippetLanguage::Swift,
            "kt" | "kts" => SnippetLanguage::Kotlin,
            "dart" => SnippetLanguage::Dart,
            "html" | "htm" => SnippetLanguage::HTML,
            "css" => SnippetLanguage::CSS,
            "scss" => SnippetLanguage::SCSS,
            "sql" => SnippetLanguage::SQL,
            "sh" | "bash" | "zsh" => SnippetLanguage::Bash,
            "ps1" => SnippetLanguage::PowerShell,
            "yml" | "yaml" => SnippetLanguage::Yaml,
            "json" => SnippetLanguage::Json,
            "xml" => SnippetLanguage::Xml,
            "md" | "markdown" => SnippetLanguage::Markdown,
            "dockerfile" => SnippetLanguage::Dockerfile,
            "toml" => SnippetLanguage::Toml,
            "ini" => SnippetLanguage::Ini,
            "conf" | "config" => SnippetLanguage::Config,
            "txt" => SnippetLanguage::Text,
            _ => SnippetLanguage::Other(ext.to_string()),
        }
    }

    /// Infer the language of a file, falling back to the file name for
    /// extensionless files such as `Dockerfile`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => Self::from_extension(ext),
            None => path
                .file_name()
                .and_then(|name| name.to_str())
                .map(Self::from_extension)
                .unwrap_or_default(),
        }
    }

    /// Lenient parse for user input: canonical ids, display names and file
    /// extensions are all accepted, case-insensitively.
    pub fn parse_lenient(input: &str) -> Self {
        let needle = input.trim().to_lowercase();
        if let Some(language) = Self::KNOWN.iter().find(|language| {
            language.id() == needle || language.display_name().to_lowercase() == needle
        }) {
            return language.clone();
        }

        match Self::from_extension(&needle) {
            SnippetLanguage::Other(_) => SnippetLanguage::Other(input.trim().to_string()),
            language => language,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            SnippetLanguage::Rust => "Rust",
            SnippetLanguage::JavaScript => "JavaScript",
            SnippetLanguage::TypeScript => "TypeScript",
            SnippetLanguage::Python => "Python",
            SnippetLanguage::Go => "Go",
            SnippetLanguage::Java => "Java",
            SnippetLanguage::C => "C",
            SnippetLanguage::Cpp => "C++",
            SnippetLanguage::CSharp => "C#",
            SnippetLanguage::PHP => "PHP",
            SnippetLanguage::Ruby => "Ruby",
            SnippetLanguage::Swift => "Swift",
            SnippetLanguage::Kotlin => "Kotlin",
            SnippetLanguage::Dart => "Dart",
            SnippetLanguage::HTML => "HTML",
            SnippetLanguage::CSS => "CSS",
            SnippetLanguage::SCSS => "SCSS",
            SnippetLanguage::SQL => "SQL",
            SnippetLanguage::Bash => "Bash",
            SnippetLanguage::PowerShell => "PowerShell",
            SnippetLanguage::Yaml => "YAML",
            SnippetLanguage::Json => "JSON",
            SnippetLanguage::Xml => "XML",
            SnippetLanguage::Markdown => "Markdown",
            SnippetLanguage::Dockerfile => "Dockerfile",
            SnippetLanguage::Toml => "TOML",
            SnippetLanguage::Ini => "INI",
            SnippetLanguage::Config => "Config",
            SnippetLanguage::Text => "Text",
            SnippetLanguage::Other(name) => name,
        }
    }

    /// Get short name for the language
    pub fn short_name(&self) -> &str {
        match self {
            SnippetLanguage::JavaScript => "JS",
            SnippetLanguage::TypeScript => "TS",
            SnippetLanguage::Python => "Py",
            SnippetLanguage::PowerShell => "PS",
            SnippetLanguage::Markdown => "MD",
            SnippetLanguage::Dockerfile => "Docker",
            SnippetLanguage::Config => "Conf",
            other => other.display_name(),
        }
    }
}

impl fmt::Display for SnippetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for SnippetLanguage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for SnippetLanguage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(SnippetLanguage::from_id(&id))
    }
}

impl Snippet {
    pub fn new(title: impl Into<String>, content: impl Into<String>, language: SnippetLanguage) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            title: title.into(),
            description: String::new(),
            content: content.into(),
            category: language.id().to_string(),
            language,
            tags: Vec::new(),
            folder_id: None,
            project_id: None,
            favorite: false,
            created_at: now,
            updated_at: now,
            usage_count: 0,
            last_used: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn in_folder(mut self, folder_id: EntityId) -> Self {
        self.assign_folder(Some(folder_id));
        self
    }

    pub fn in_project(mut self, project_id: EntityId) -> Self {
        self.assign_project(Some(project_id));
        self
    }

    /// Setting a folder always clears the project.
    pub fn assign_folder(&mut self, folder_id: Option<EntityId>) {
        self.folder_id = folder_id;
        self.project_id = None;
    }

    /// Setting a project always clears the folder.
    pub fn assign_project(&mut self, project_id: Option<EntityId>) {
        self.project_id = project_id;
        self.folder_id = None;
    }

    pub fn detach(&mut self) {
        self.folder_id = None;
        self.project_id = None;
    }

    pub fn is_unassigned(&self) -> bool {
        self.folder_id.is_none() && self.project_id.is_none()
    }

    pub fn mark_used(&mut self) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_used = Some(Utc::now());
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// A fresh copy with a new id, reset usage and favorite state.
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            title: format!("{DUPLICATE_TITLE_PREFIX}{}", self.title),
            favorite: false,
            usage_count: 0,
            last_used: None,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Editable snippet fields. Placement (`folderId`/`projectId`) only changes
/// through the store's move operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub language: Option<SnippetLanguage>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub favorite: Option<bool>,
}

impl SnippetPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn language(mut self, language: SnippetLanguage) -> Self {
        self.language = Some(language);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = Some(normalize_tags(tags));
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = Some(favorite);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `snippet`. Does not touch `updated_at`.
    pub fn apply_to(self, snippet: &mut Snippet) {
        if let Some(title) = self.title {
            snippet.title = title;
        }
        if let Some(description) = self.description {
            snippet.description = description;
        }
        if let Some(content) = self.content {
            snippet.content = content;
        }
        if let Some(language) = self.language {
            snippet.language = language;
        }
        if let Some(tags) = self.tags {
            snippet.tags = normalize_tags(tags);
        }
        if let Some(category) = self.category {
            snippet.category = category;
        }
        if let Some(favorite) = self.favorite {
            snippet.favorite = favorite;
        }
    }
}
