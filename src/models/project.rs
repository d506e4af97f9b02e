use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::id::EntityId;

/// A project groups folders. Projects may nest under other projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectItem {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectItem {
    pub fn new(name: &str, description: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            name: name.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_with_parent(name: &str, description: Option<&str>, parent_id: EntityId) -> Self {
        let mut project = Self::new(name, description);
        project.parent_id = Some(parent_id);
        project
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    /// `Some(None)` makes the project a root project.
    pub parent_id: Option<Option<EntityId>>,
}

impl ProjectPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn reparent(parent_id: Option<EntityId>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }
}
