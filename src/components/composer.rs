use leptos::ev;
use leptos::prelude::*;

use crate::rich_text::RichTextDoc;
use crate::thread::sync::ThreadSync;

/// Comment composer. Focus, keystrokes, and blur drive the typing-indicator
/// lifecycle; Enter sends, Shift+Enter inserts a newline.
#[component]
pub fn MessageComposer(sync: ThreadSync) -> impl IntoView {
    let (input, set_input) = signal(String::new());
    let is_sending = sync.is_sending;

    let send = {
        let sync = sync.clone();
        move || {
            let text = input.get_untracked().trim().to_string();
            if text.is_empty() || is_sending.get_untracked() {
                return;
            }
            set_input.set(String::new());
            sync.send_message(RichTextDoc::from_plain_text(&text));
        }
    };

    let send_clone = send.clone();
    let sync_keys = sync.clone();
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send_clone();
        } else {
            sync_keys.handle_input();
        }
    };

    let sync_focus = sync.clone();
    let sync_blur = sync.clone();
    let sync_input = sync.clone();

    view! {
        <div class="composer">
            <textarea
                rows="1"
                placeholder="Write a comment…"
                prop:value=input
                on:focus=move |_| sync_focus.handle_input_focus()
                on:blur=move |_| sync_blur.handle_input_blur()
                on:input=move |ev| {
                    set_input.set(event_target_value(&ev));
                    sync_input.handle_input();
                }
                on:keydown=on_keydown
                disabled=move || is_sending.get()
            />
            <button
                class="send-btn"
                on:click=move |_| send()
                disabled=move || is_sending.get() || input.get().trim().is_empty()
            >
                {move || if is_sending.get() { "Sending…" } else { "Send" }}
            </button>
        </div>
    }
}
