//! Viewer-list reducer.
//!
//! Presence is eventually consistent: a `user_joined` snapshot is the single
//! authority for membership and always wins over previously patched state,
//! even when it drops a viewer the client knew about. Incremental frames only
//! patch viewers that are already present.

use crate::models::Viewer;
use crate::thread::protocol::ServerFrame;

/// Applies a presence-bearing frame to the local viewer list. Non-presence
/// frames are ignored.
pub fn apply(viewers: &mut Vec<Viewer>, frame: &ServerFrame) {
    match frame {
        ServerFrame::UserJoined { viewers: snapshot } => {
            *viewers = snapshot.clone();
        }
        ServerFrame::UserLeft { user_id } => {
            viewers.retain(|v| v.user_id != *user_id);
        }
        ServerFrame::TypingUpdate { user_id, is_typing } => {
            // Never fabricate a viewer from a typing event alone; membership
            // comes only from snapshots.
            if let Some(viewer) = viewers.iter_mut().find(|v| v.user_id == *user_id) {
                viewer.is_typing = *is_typing;
            }
        }
        _ => {}
    }
}
