use serde::{Deserialize, Serialize};

/// Chat provider a conversation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Chatgpt,
    Claude,
    Qwen,
}

/// A favorited conversation.
///
/// `conversation_id` is the unique key within the favorites list and is
/// immutable after creation. An absent `folderId` on the wire and an
/// explicit `null` both mean "at root" — they deserialize to `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteItem {
    pub conversation_id: String,
    pub title: String,
    /// Epoch milliseconds when the favorite was created
    pub added_at: i64,
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Input for `FavoritesManager::add`. Folder placement: `folder_id` of
/// `None` means "not specified" (fall back to the selected folder when
/// `use_selected_folder` is set), `Some(None)` pins the item to root,
/// `Some(Some(id))` requests an explicit folder.
#[derive(Debug, Clone)]
pub struct NewFavorite {
    pub conversation_id: String,
    pub title: String,
    pub provider: Provider,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub folder_id: Option<Option<String>>,
    pub use_selected_folder: bool,
}

impl NewFavorite {
    pub fn new(conversation_id: impl Into<String>, title: impl Into<String>, provider: Provider) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            title: title.into(),
            provider,
            url: None,
            tags: None,
            folder_id: None,
            use_selected_folder: true,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn in_folder(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = Some(folder_id);
        self
    }
}

/// Partial update for a favorite. Only mutable fields are representable:
/// `conversation_id` and `added_at` cannot be patched at the type level.
///
/// The outer `Option` on `folder_id` distinguishes "leave unchanged"
/// (`None`, not serialized) from "move to root" (`Some(None)`, serialized
/// as an explicit `null`).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Option<String>>,
}

impl FavoritePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.tags.is_none() && self.folder_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_and_null_folder_both_mean_root() {
        let absent: FavoriteItem = serde_json::from_value(json!({
            "conversationId": "c1",
            "title": "t",
            "addedAt": 1,
            "provider": "chatgpt",
        }))
        .unwrap();
        let null: FavoriteItem = serde_json::from_value(json!({
            "conversationId": "c2",
            "title": "t",
            "addedAt": 1,
            "provider": "claude",
            "folderId": null,
        }))
        .unwrap();
        assert_eq!(absent.folder_id, None);
        assert_eq!(null.folder_id, None);
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = FavoritePatch {
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"title": "renamed"}));
    }

    #[test]
    fn test_patch_move_to_root_is_explicit_null() {
        let patch = FavoritePatch {
            folder_id: Some(None),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({"folderId": null}));
    }
}
