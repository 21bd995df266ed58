mod actions;
mod api;
mod components;
mod error;
mod models;
mod rich_text;
mod thread;

use std::rc::Rc;

use leptos::mount::mount_to_body;
use leptos::prelude::*;
use leptos::task::spawn_local;

use actions::executor::ActionExecutor;
use components::action_dialog::{ActionBar, ActionDialog, default_form_registry};
use components::activity_feed::ActivityFeed;
use components::media_thread::MediaThreadCard;
use components::thread_drawer::ThreadDrawer;
use models::{ActionDescriptor, CurrentUser, MediaItem, ThreadKey};
use thread::sync::use_thread_sync;

/// Root application component. Every thread surface is deferred until the
/// signed-in user is known.
#[component]
fn App() -> impl IntoView {
    let (user, set_user) = signal(None::<CurrentUser>);

    spawn_local(async move {
        match api::fetch_current_user().await {
            Ok(me) => set_user.set(Some(me)),
            Err(e) => log::error!("failed to load current user: {e}"),
        }
    });

    let object_id = current_object_id();

    view! {
        <div class="app-container">
            {move || {
                let object_id = object_id.clone();
                user.get().map(|user| {
                    view! { <DeliverableWorkspace user=user deliverable_id=object_id /> }
                })
            }}
        </div>
    }
}

/// Detail workspace for one deliverable: action bar, inline activity feed,
/// per-media comment cards, and the activity drawer. The inline feed and the
/// drawer address the same thread and share one connection.
#[component]
fn DeliverableWorkspace(user: CurrentUser, deliverable_id: String) -> impl IntoView {
    let key = ThreadKey::new("deliverable", deliverable_id.clone());
    let drawer_open = RwSignal::new(false);

    let (enabled, _) = signal(true);
    let sync = use_thread_sync(key.clone(), user.clone(), enabled.into());

    let (actions, set_actions) = signal(Vec::<ActionDescriptor>::new());
    let (media, set_media) = signal(Vec::<MediaItem>::new());

    let load_id = deliverable_id.clone();
    spawn_local(async move {
        match api::fetch_object_actions("deliverables", &load_id).await {
            Ok(list) => set_actions.set(list),
            Err(e) => log::error!("failed to load actions: {e}"),
        }
        match api::fetch_deliverable_media(&load_id).await {
            Ok(list) => set_media.set(list),
            Err(e) => log::error!("failed to load media: {e}"),
        }
    });

    let refresh_id = deliverable_id.clone();
    let executor = ActionExecutor::new(
        Rc::new(default_form_registry()),
        Some(deliverable_id.clone()),
    )
    .with_invalidate(move |group, _| {
        // Availability may have changed for the whole group.
        log::debug!("re-evaluating actions after {group} change");
        let id = refresh_id.clone();
        spawn_local(async move {
            if let Ok(list) = api::fetch_object_actions("deliverables", &id).await {
                set_actions.set(list);
            }
        });
    });

    let media_user = user.clone();
    let drawer_user = user.clone();
    let drawer_key = key.clone();

    view! {
        <main class="workspace">
            <header class="workspace-header">
                <h2>{format!("Deliverable {deliverable_id}")}</h2>
                <span class="user-name">{user.name.clone()}</span>
                <ActionBar actions=actions.into() executor=executor.clone() />
                <button class="drawer-toggle" on:click=move |_| drawer_open.set(true)>
                    "Activity"
                </button>
            </header>

            <ActionDialog executor=executor />

            <section class="feed-pane">
                <ActivityFeed sync=sync.clone() />
            </section>

            <section class="media-pane">
                <For
                    each=move || media.get()
                    key=|m| m.id.clone()
                    let:item
                >
                    <MediaThreadCard media=item user=media_user.clone() />
                </For>
            </section>

            <ThreadDrawer key=drawer_key user=drawer_user open=drawer_open />
        </main>
    }
}

/// Object identity from the current path, e.g. `/deliverables/abc123`.
fn current_object_id() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .and_then(|p| {
            p.trim_end_matches('/')
                .rsplit('/')
                .next()
                .map(str::to_string)
        })
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| "demo".to_string())
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
