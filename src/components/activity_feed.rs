use leptos::prelude::*;

use crate::components::composer::MessageComposer;
use crate::models::{ThreadMessage, Viewer};
use crate::rich_text::RichTextDoc;
use crate::thread::sync::{EditDecision, ThreadSync, edit_decision};

/// Message feed for one thread: history, typing line, and composer. Reused
/// by the inline feed, the drawer, and per-media comment cards.
#[component]
pub fn ActivityFeed(sync: ThreadSync) -> impl IntoView {
    let messages = sync.messages;
    let is_loading = sync.is_loading;
    let error = sync.error;
    let typing_users = sync.typing_users();

    let item_sync = StoredValue::new_local(sync.clone());

    view! {
        <div class="activity-feed">
            {move || {
                error.get().map(|err| {
                    view! {
                        <div class="error-banner">{err}</div>
                    }
                })
            }}

            <div class="feed-messages">
                {move || {
                    if is_loading.get() {
                        view! {
                            <div class="empty-state">"Loading…"</div>
                        }.into_any()
                    } else if messages.get().is_empty() {
                        view! {
                            <div class="empty-state">"No activity yet"</div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || messages.get()
                                key=|m| (m.id.clone(), m.updated_at.clone())
                                let:msg
                            >
                                <MessageItem message=msg sync=item_sync.get_value() />
                            </For>
                        }.into_any()
                    }
                }}
            </div>

            {move || {
                let typing = typing_users.get();
                (!typing.is_empty()).then(|| {
                    view! {
                        <div class="typing-line">{typing_line(&typing)}</div>
                    }
                })
            }}

            <MessageComposer sync=sync.clone() />
        </div>
    }
}

/// Whether the inline editor closes for a save outcome. Applied and
/// unchanged drafts close; rejected drafts keep the editor (and the text)
/// on screen.
fn editor_closes_after(decision: EditDecision) -> bool {
    matches!(decision, EditDecision::Apply | EditDecision::SameContent)
}

fn typing_line(typing: &[Viewer]) -> String {
    let names: Vec<&str> = typing.iter().map(|v| v.name.as_str()).collect();
    match names.as_slice() {
        [one] => format!("{one} is typing…"),
        many => format!("{} are typing…", many.join(", ")),
    }
}

/// One feed row, with edit/delete controls on the viewer's own messages.
#[component]
fn MessageItem(message: ThreadMessage, sync: ThreadSync) -> impl IntoView {
    let is_own = message.author.id == sync.current_user().id;
    let (editing, set_editing) = signal(false);
    let (draft, set_draft) = signal(String::new());

    let message_id = message.id.clone();
    let prefill = message.content.to_plain_text();

    let start_edit = move |_| {
        set_draft.set(prefill.clone());
        set_editing.set(true);
    };

    let save_sync = sync.clone();
    let save_msg = message.clone();
    let save_edit = move |_| {
        let content = RichTextDoc::from_plain_text(draft.get_untracked().trim());
        let decision = edit_decision(&save_msg, &save_sync.current_user().id, &content);
        if decision == EditDecision::Apply {
            save_sync.edit_message(&save_msg.id, content);
        }
        // A rejected draft stays in the editor rather than vanishing.
        if editor_closes_after(decision) {
            set_editing.set(false);
        }
    };
    let save_edit = StoredValue::new_local(save_edit);

    let delete_sync = sync.clone();
    let delete_id = message_id.clone();
    let delete = move |_| delete_sync.delete_message(&delete_id);

    view! {
        <div class="feed-message" class:own=is_own>
            <div class="message-meta">
                <span class="author">{message.author.name.clone()}</span>
                {message.is_edited().then(|| view! { <span class="edited">"(edited)"</span> })}
            </div>
            {move || {
                if editing.get() {
                    view! {
                        <div class="edit-row">
                            <textarea
                                rows="2"
                                prop:value=draft
                                on:input=move |ev| set_draft.set(event_target_value(&ev))
                            />
                            <button
                                on:click=save_edit.get_value()
                                disabled=move || draft.get().trim().is_empty()
                            >
                                "Save"
                            </button>
                            <button on:click=move |_| set_editing.set(false)>"Cancel"</button>
                        </div>
                    }.into_any()
                } else {
                    view! {
                        <div class="message-body">{message.content.to_plain_text()}</div>
                    }.into_any()
                }
            }}
            {is_own.then(|| {
                view! {
                    <div class="message-controls">
                        <button class="link-btn" on:click=start_edit.clone()>"Edit"</button>
                        <button class="link-btn" on:click=delete.clone()>"Delete"</button>
                    </div>
                }
            })}
        </div>
    }
}
