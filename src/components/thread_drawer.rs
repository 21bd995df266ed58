use leptos::prelude::*;

use crate::components::activity_feed::ActivityFeed;
use crate::models::{CurrentUser, ThreadKey};
use crate::thread::registry::ConnectionStatus;
use crate::thread::sync::use_thread_sync;

/// Slide-over activity drawer for an object's thread. The connection is only
/// held while the drawer is open; closing it releases this surface's hold on
/// the shared socket.
#[component]
pub fn ThreadDrawer(key: ThreadKey, user: CurrentUser, open: RwSignal<bool>) -> impl IntoView {
    let sync = use_thread_sync(key, user, open.into());
    let status = sync.status();
    let viewers = sync.active_viewers();
    let sync = StoredValue::new_local(sync);

    view! {
        <aside class="thread-drawer" class:open=move || open.get()>
            <div class="drawer-header">
                <h3>"Activity"</h3>
                <span class="connection-status">
                    {move || match status.get() {
                        ConnectionStatus::Connected => "live",
                        ConnectionStatus::Connecting => "connecting…",
                        ConnectionStatus::Reconnecting => "reconnecting…",
                        ConnectionStatus::Disconnected => "offline",
                    }}
                </span>
                <button class="close-btn" on:click=move |_| open.set(false)>
                    "×"
                </button>
            </div>
            <div class="viewer-chips">
                <For
                    each=move || viewers.get()
                    key=|v| v.user_id.clone()
                    let:viewer
                >
                    <span class="viewer-chip" title=viewer.name.clone()>
                        {viewer.name.chars().next().unwrap_or('?').to_string()}
                    </span>
                </For>
            </div>
            {move || {
                open.get().then(|| view! { <ActivityFeed sync=sync.get_value() /> })
            }}
        </aside>
    }
}
