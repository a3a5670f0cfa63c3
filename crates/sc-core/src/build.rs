use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Build configuration for the player avatar and the NPCs of a game.
///
/// Items point into it through [`ItemInstance::build_id`](crate::ItemInstance::build_id).
/// The avatar entry is checked before the NPC list, so an NPC sharing the
/// avatar's id is shadowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildDocument {
    /// Configuration of the player avatar, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Json>,
    /// Configurations of non-player characters, in document order.
    #[serde(default)]
    pub npcs: Vec<Json>,
}

impl BuildDocument {
    /// Find the entry whose `id` equals `build_id`.
    ///
    /// An empty `build_id` never matches. Entries that are not JSON objects
    /// are skipped.
    pub fn entry(&self, build_id: &str) -> Option<&Json> {
        if build_id.is_empty() {
            return None;
        }
        self.avatar
            .iter()
            .chain(self.npcs.iter())
            .filter(|entry| entry.is_object())
            .find(|entry| entry_id(entry).as_deref() == Some(build_id))
    }

    /// Total number of entries, avatar included.
    pub fn len(&self) -> usize {
        usize::from(self.avatar.is_some()) + self.npcs.len()
    }

    /// Whether the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entry_id(entry: &Json) -> Option<String> {
    match entry.get("id")? {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
