use serde::{Deserialize, Serialize};

use crate::models::Viewer;

/// Frames the client sends over a thread channel.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Typing { is_typing: bool },
    MarkRead,
    Ping { timestamp: f64 },
}

/// Frames the server pushes on a thread channel. `MessageUpdate` carries no
/// message body: it is only a signal to re-pull history over REST, so the
/// client never trusts inline WebSocket data for durable content.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Authoritative full presence snapshot. Replaces all local viewer state.
    UserJoined { viewers: Vec<Viewer> },
    UserLeft { user_id: String },
    TypingUpdate { user_id: String, is_typing: bool },
    MessageUpdate,
    MarkedRead,
    Pong,
    /// Frame kinds this client predates. Logged and ignored.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_user_joined_snapshot() {
        let frame: ServerFrame = serde_json::from_str(
            r#"{"type":"user_joined","viewers":[{"user_id":"u1","name":"Ada","is_typing":false}]}"#,
        )
        .unwrap();
        match frame {
            ServerFrame::UserJoined { viewers } => {
                assert_eq!(viewers.len(), 1);
                assert_eq!(viewers[0].user_id, "u1");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn decodes_typing_update() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"typing_update","user_id":"u2","is_typing":true}"#)
                .unwrap();
        assert_eq!(
            frame,
            ServerFrame::TypingUpdate { user_id: "u2".into(), is_typing: true }
        );
    }

    #[test]
    fn unknown_frame_kinds_are_tolerated() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"reaction_added","emoji":"🔥"}"#).unwrap();
        assert_eq!(frame, ServerFrame::Unknown);
    }

    #[test]
    fn encodes_outbound_frames_with_snake_case_tags() {
        let json = serde_json::to_string(&ClientFrame::Typing { is_typing: true }).unwrap();
        assert_eq!(json, r#"{"type":"typing","is_typing":true}"#);

        let json = serde_json::to_string(&ClientFrame::MarkRead).unwrap();
        assert_eq!(json, r#"{"type":"mark_read"}"#);
    }
}
