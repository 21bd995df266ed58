use serde::{Deserialize, Serialize};

use crate::rich_text::RichTextDoc;

/// Addressing key for a thread: an object-type tag plus an opaque object id.
/// Threads are not materialized client-side; this pair scopes messages and
/// presence (e.g. `media:abc123`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadKey {
    pub threadable_type: String,
    pub threadable_id: String,
}

impl ThreadKey {
    pub fn new(threadable_type: impl Into<String>, threadable_id: impl Into<String>) -> Self {
        Self {
            threadable_type: threadable_type.into(),
            threadable_id: threadable_id.into(),
        }
    }
}

impl std::fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.threadable_type, self.threadable_id)
    }
}

/// Matches the backend message author projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub id: String,
    pub name: String,
}

/// Matches the backend thread message model. `content` is a rich-text
/// document, never a plain string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub author: MessageAuthor,
    pub content: RichTextDoc,
    pub created_at: String,
    pub updated_at: String,
}

impl ThreadMessage {
    /// A message counts as edited once the server has bumped `updated_at`.
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}

/// A user currently connected to a thread's real-time channel. Ephemeral:
/// lives only as long as some WebSocket session keeps it alive server-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub is_typing: bool,
}

/// The signed-in user, as returned by `/api/me`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
}

/// A backend-declared capability attached to an object or list row. Always
/// delivered fresh with the response it annotates, never cached client-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub identifier: String,
    pub label: String,
    pub action_group: String,
    #[serde(default)]
    pub confirmation_message: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub should_redirect_to_parent: bool,
}

fn default_true() -> bool {
    true
}

/// A media item attached to a deliverable. Only the fields the thread
/// surfaces need; upload and storage mechanics live elsewhere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub filename: String,
}

/// Request body for creating or editing a thread message.
#[derive(Clone, Debug, Serialize)]
pub struct MessageBody {
    pub content: RichTextDoc,
}

/// Request body for the action execute endpoints.
#[derive(Clone, Debug, Serialize)]
pub struct ExecuteActionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_key_display_joins_type_and_id() {
        let key = ThreadKey::new("media", "abc123");
        assert_eq!(key.to_string(), "media:abc123");
    }

    #[test]
    fn message_edited_only_when_timestamps_differ() {
        let mut msg = ThreadMessage {
            id: "m1".into(),
            author: MessageAuthor { id: "u1".into(), name: "Ada".into() },
            content: RichTextDoc::from_plain_text("hi"),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        assert!(!msg.is_edited());
        msg.updated_at = "2026-01-01T00:05:00Z".into();
        assert!(msg.is_edited());
    }

    #[test]
    fn action_descriptor_defaults_apply() {
        let action: ActionDescriptor = serde_json::from_str(
            r#"{"identifier":"archive","label":"Archive","action_group":"deliverables"}"#,
        )
        .unwrap();
        assert!(action.available);
        assert!(!action.should_redirect_to_parent);
        assert_eq!(action.priority, 0);
        assert!(action.confirmation_message.is_none());
    }
}
