use leptos::prelude::*;

use crate::components::activity_feed::ActivityFeed;
use crate::models::{CurrentUser, MediaItem, ThreadKey};
use crate::thread::sync::use_thread_sync;

/// Collapsible comment card for one media item. Sync stays disabled until
/// the card is first expanded, so collapsed cards cost no socket and no
/// fetch; collapsing again releases the hold.
#[component]
pub fn MediaThreadCard(media: MediaItem, user: CurrentUser) -> impl IntoView {
    let (expanded, set_expanded) = signal(false);
    let sync = use_thread_sync(ThreadKey::new("media", media.id.clone()), user, expanded.into());
    let messages = sync.messages;
    let sync = StoredValue::new_local(sync);

    view! {
        <div class="media-thread-card" class:expanded=move || expanded.get()>
            <button
                class="card-header"
                on:click=move |_| set_expanded.set(!expanded.get_untracked())
            >
                <span class="media-name">{media.filename.clone()}</span>
                <span class="comment-count">
                    {move || {
                        let count = messages.get().len();
                        if expanded.get() && count > 0 {
                            format!("{count} comments")
                        } else {
                            String::new()
                        }
                    }}
                </span>
                <span class="chevron">{move || if expanded.get() { "▾" } else { "▸" }}</span>
            </button>
            {move || {
                expanded.get().then(|| view! { <ActivityFeed sync=sync.get_value() /> })
            }}
        </div>
    }
}
