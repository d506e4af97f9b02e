use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier shared by snippets, folders and projects.
///
/// New entities get a random UUID, but any string is accepted on load so
/// that ids written by older versions (`snippet-1712345678901`) keep working.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fresh_ids_are_uuids() {
        let id = EntityId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, EntityId::new());
    }

    #[test]
    fn any_string_round_trips_through_json() {
        let parsed: EntityId = serde_json::from_str("\"snippet-1712345678901\"").unwrap();
        assert_eq!(parsed.as_str(), "snippet-1712345678901");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"snippet-1712345678901\"");
    }
}
