use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::id::EntityId;

/// A named organizational node. The parent is either another folder or a
/// project item; both live in the same id space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            name: name.trim().to_string(),
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_with_parent(name: &str, parent_id: EntityId) -> Self {
        let mut folder = Self::new(name);
        folder.parent_id = Some(parent_id);
        folder
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderPatch {
    pub name: Option<String>,
    /// `Some(None)` moves the folder to the root.
    pub parent_id: Option<Option<EntityId>>,
}

impl FolderPatch {
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
