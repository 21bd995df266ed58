//! The single integration point UI surfaces use for a thread: REST-sourced
//! message history combined with the shared connection's live signals.
//!
//! Sends are non-optimistic. A mutation never touches `messages` directly;
//! both its own success path and the `message_update` notification converge
//! on the same full refetch, which replaces local state wholesale. Either
//! path may arrive first and re-applying is idempotent.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::models::{CurrentUser, ThreadKey, ThreadMessage, Viewer};
use crate::rich_text::RichTextDoc;
use crate::thread::connection::{ThreadConnectionHandle, use_thread_connection};
use crate::thread::registry::ConnectionStatus;
use crate::thread::typing::{TYPING_IDLE_MS, TypingEvent, TypingState};

/// Outcome of the local pre-checks before an edit goes to the server. The
/// server remains the actual authority; this only avoids pointless calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditDecision {
    Apply,
    NotAuthor,
    SameContent,
    EmptyContent,
}

pub fn edit_decision(
    message: &ThreadMessage,
    user_id: &str,
    new_content: &RichTextDoc,
) -> EditDecision {
    if message.author.id != user_id {
        EditDecision::NotAuthor
    } else if !new_content.has_text() {
        EditDecision::EmptyContent
    } else if message.content == *new_content {
        EditDecision::SameContent
    } else {
        EditDecision::Apply
    }
}

/// Applies one fetched history snapshot: replace, never append, so the same
/// `message_update` notification handled twice yields the same list.
fn apply_history(messages: RwSignal<Vec<ThreadMessage>>, history: Vec<ThreadMessage>) {
    messages.set(history);
}

/// Reactive thread state plus the actions to mutate it. Cheap to clone; all
/// clones share the same signals and connection hold.
#[derive(Clone)]
pub struct ThreadSync {
    key: ThreadKey,
    current_user: CurrentUser,
    pub messages: RwSignal<Vec<ThreadMessage>>,
    pub is_loading: RwSignal<bool>,
    pub is_sending: RwSignal<bool>,
    pub error: RwSignal<Option<String>>,
    connection: ThreadConnectionHandle,
    refetch: Rc<dyn Fn()>,
    typing: Rc<RefCell<TypingState>>,
    idle_timer: Rc<RefCell<Option<Timeout>>>,
}

/// Composes the shared connection with REST history for one UI surface.
///
/// Concurrent syncs of the same thread share the socket and presence but
/// keep independent message state; the consumption contract is unchanged
/// from one-surface-per-thread.
pub fn use_thread_sync(
    key: ThreadKey,
    current_user: CurrentUser,
    enabled: Signal<bool>,
) -> ThreadSync {
    let messages = RwSignal::new(Vec::<ThreadMessage>::new());
    let is_loading = RwSignal::new(false);
    let is_sending = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);

    let refetch_key = key.clone();
    let refetch: Rc<dyn Fn()> = Rc::new(move || {
        let key = refetch_key.clone();
        spawn_local(async move {
            match api::fetch_messages(&key).await {
                Ok(history) => apply_history(messages, history),
                Err(e) => {
                    log::error!("failed to refetch {key}: {e}");
                    error.set(Some(e.to_string()));
                }
            }
        });
    });

    let connection = use_thread_connection(key.clone(), enabled, Rc::clone(&refetch));

    // Initial history load, re-run on every disabled -> enabled transition
    // (a collapsed card may have gone stale while detached).
    let load_key = key.clone();
    Effect::new(move |prev: Option<bool>| {
        let enabled_now = enabled.get();
        if enabled_now && prev != Some(true) {
            is_loading.set(true);
            let key = load_key.clone();
            spawn_local(async move {
                match api::fetch_messages(&key).await {
                    Ok(history) => apply_history(messages, history),
                    Err(e) => {
                        log::error!("failed to load {key}: {e}");
                        error.set(Some(e.to_string()));
                    }
                }
                is_loading.set(false);
            });
        }
        enabled_now
    });

    ThreadSync {
        key,
        current_user,
        messages,
        is_loading,
        is_sending,
        error,
        connection,
        refetch,
        typing: Rc::new(RefCell::new(TypingState::new())),
        idle_timer: Rc::new(RefCell::new(None)),
    }
}

impl ThreadSync {
    pub fn current_user(&self) -> &CurrentUser {
        &self.current_user
    }

    pub fn status(&self) -> Signal<ConnectionStatus, LocalStorage> {
        self.connection.status()
    }

    /// Viewers other than the current user.
    pub fn active_viewers(&self) -> Signal<Vec<Viewer>, LocalStorage> {
        let viewers = self.connection.viewers();
        let own_id = self.current_user.id.clone();
        Signal::derive_local(move || {
            viewers
                .get()
                .into_iter()
                .filter(|v| v.user_id != own_id)
                .collect()
        })
    }

    /// The subset of `active_viewers` currently typing.
    pub fn typing_users(&self) -> Signal<Vec<Viewer>, LocalStorage> {
        let viewers = self.active_viewers();
        Signal::derive_local(move || viewers.get().into_iter().filter(|v| v.is_typing).collect())
    }

    /// Validates content locally, creates the message over REST, and
    /// converges via refetch. No optimistic insert.
    pub fn send_message(&self, content: RichTextDoc) {
        if self.is_sending.get_untracked() {
            return;
        }
        if !content.has_text() {
            log::debug!("dropping empty message for {}", self.key);
            return;
        }

        self.signal_typing(TypingEvent::MessageSent);
        self.is_sending.set(true);
        self.error.set(None);

        let key = self.key.clone();
        let is_sending = self.is_sending;
        let error = self.error;
        let refetch = Rc::clone(&self.refetch);
        spawn_local(async move {
            match api::create_message(&key, &content).await {
                Ok(_) => refetch(),
                Err(e) => {
                    log::error!("failed to send message to {key}: {e}");
                    error.set(Some(e.to_string()));
                }
            }
            is_sending.set(false);
        });
    }

    pub fn edit_message(&self, message_id: &str, content: RichTextDoc) {
        let existing = self
            .messages
            .with_untracked(|msgs| msgs.iter().find(|m| m.id == message_id).cloned());
        let Some(existing) = existing else {
            return;
        };
        match edit_decision(&existing, &self.current_user.id, &content) {
            EditDecision::Apply => {}
            decision => {
                log::debug!("skipping edit of {message_id}: {decision:?}");
                return;
            }
        }

        let key = self.key.clone();
        let message_id = message_id.to_string();
        let error = self.error;
        let refetch = Rc::clone(&self.refetch);
        spawn_local(async move {
            match api::edit_message(&key, &message_id, &content).await {
                Ok(_) => refetch(),
                Err(e) => {
                    log::error!("failed to edit {message_id} in {key}: {e}");
                    error.set(Some(e.to_string()));
                }
            }
        });
    }

    pub fn delete_message(&self, message_id: &str) {
        let is_own = self.messages.with_untracked(|msgs| {
            msgs.iter()
                .any(|m| m.id == message_id && m.author.id == self.current_user.id)
        });
        if !is_own {
            return;
        }

        let key = self.key.clone();
        let message_id = message_id.to_string();
        let error = self.error;
        let refetch = Rc::clone(&self.refetch);
        spawn_local(async move {
            match api::delete_message(&key, &message_id).await {
                Ok(()) => refetch(),
                Err(e) => {
                    log::error!("failed to delete {message_id} in {key}: {e}");
                    error.set(Some(e.to_string()));
                }
            }
        });
    }

    pub fn handle_input_focus(&self) {
        self.signal_typing(TypingEvent::Focus);
    }

    pub fn handle_input(&self) {
        self.signal_typing(TypingEvent::Keystroke);
    }

    pub fn handle_input_blur(&self) {
        self.signal_typing(TypingEvent::Blur);
    }

    fn signal_typing(&self, event: TypingEvent) {
        if let Some(flag) = self.typing.borrow_mut().on_event(event) {
            self.connection.send_typing(flag);
        }
        if TypingState::arms_idle_timer(event) {
            self.arm_idle_timer();
        } else if !self.typing.borrow().is_typing() {
            // Dropping the pending timer cancels it.
            self.idle_timer.borrow_mut().take();
        }
    }

    fn arm_idle_timer(&self) {
        let typing = Rc::clone(&self.typing);
        let connection = self.connection;
        let timer = Timeout::new(TYPING_IDLE_MS, move || {
            if let Some(flag) = typing.borrow_mut().on_event(TypingEvent::IdleExpired) {
                connection.send_typing(flag);
            }
        });
        *self.idle_timer.borrow_mut() = Some(timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageAuthor;

    fn message(id: &str, author_id: &str, text: &str) -> ThreadMessage {
        ThreadMessage {
            id: id.to_string(),
            author: MessageAuthor { id: author_id.to_string(), name: author_id.to_string() },
            content: RichTextDoc::from_plain_text(text),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn identical_content_edit_is_a_no_op() {
        let msg = message("m1", "u1", "hello");
        let same = RichTextDoc::from_plain_text("hello");
        assert_eq!(edit_decision(&msg, "u1", &same), EditDecision::SameContent);
    }

    #[test]
    fn changed_content_by_author_applies() {
        let msg = message("m1", "u1", "hello");
        let changed = RichTextDoc::from_plain_text("hello again");
        assert_eq!(edit_decision(&msg, "u1", &changed), EditDecision::Apply);
    }

    #[test]
    fn non_author_edits_are_rejected_locally() {
        let msg = message("m1", "u1", "hello");
        let changed = RichTextDoc::from_plain_text("hijacked");
        assert_eq!(edit_decision(&msg, "u2", &changed), EditDecision::NotAuthor);
    }

    #[test]
    fn whitespace_only_edit_is_rejected() {
        let msg = message("m1", "u1", "hello");
        let blank = RichTextDoc::from_plain_text("   ");
        assert_eq!(edit_decision(&msg, "u1", &blank), EditDecision::EmptyContent);
    }

    #[test]
    fn refetch_replaces_rather_than_appends() {
        let messages = RwSignal::new(vec![message("m0", "u1", "stale")]);
        let fetched = vec![message("m1", "u1", "one"), message("m2", "u2", "two")];

        // The same notification handled twice produces the same list, and
        // anything not in the snapshot is gone.
        apply_history(messages, fetched.clone());
        apply_history(messages, fetched.clone());
        assert_eq!(messages.get_untracked().len(), 2);
        assert_eq!(messages.get_untracked(), fetched);
    }
}
