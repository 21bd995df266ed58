use std::rc::Rc;

use leptos::prelude::*;
use serde_json::json;

use crate::actions::executor::ActionExecutor;
use crate::actions::registry::{ActionFormContext, ActionFormRegistry, ActionKind};
use crate::models::ActionDescriptor;

/// The forms this client ships. Reject and request-revision both collect a
/// note for the creator; everything else confirms or executes directly.
pub fn default_form_registry() -> ActionFormRegistry {
    let mut registry = ActionFormRegistry::new();
    for kind in [ActionKind::Reject, ActionKind::RequestRevision] {
        registry.register(
            kind,
            Rc::new(|ctx: ActionFormContext| {
                view! {
                    <ActionNoteForm
                        action=ctx.action
                        on_submit=ctx.on_submit
                        on_cancel=ctx.on_cancel
                    />
                }
                .into_any()
            }),
        );
    }
    registry
}

#[component]
fn ActionNoteForm(
    action: ActionDescriptor,
    on_submit: UnsyncCallback<serde_json::Value>,
    on_cancel: UnsyncCallback<()>,
) -> impl IntoView {
    let (note, set_note) = signal(String::new());

    let submit = move |_| {
        let text = note.get_untracked().trim().to_string();
        if text.is_empty() {
            return;
        }
        on_submit.run(json!({ "note": text }));
    };

    view! {
        <div class="action-form">
            <h4>{action.label.clone()}</h4>
            <textarea
                rows="3"
                placeholder="Add a note for the creator…"
                prop:value=note
                on:input=move |ev| set_note.set(event_target_value(&ev))
            />
            <div class="dialog-buttons">
                <button
                    class="primary"
                    on:click=submit
                    disabled=move || note.get().trim().is_empty()
                >
                    {action.label.clone()}
                </button>
                <button on:click=move |_| on_cancel.run(())>"Cancel"</button>
            </div>
        </div>
    }
}

/// Action buttons for one object, highest priority first.
#[component]
pub fn ActionBar(actions: Signal<Vec<ActionDescriptor>>, executor: ActionExecutor) -> impl IntoView {
    let executor = StoredValue::new_local(executor);
    let sorted = move || {
        let mut list = actions.get();
        list.sort_by_key(|a| std::cmp::Reverse(a.priority));
        list
    };

    view! {
        <div class="action-bar">
            <For
                each=sorted
                key=|a| a.identifier.clone()
                let:action
            >
                {
                    let executor = executor.get_value();
                    let disabled = !action.available;
                    let label = action.label.clone();
                    view! {
                        <button
                            class="action-btn"
                            disabled=disabled
                            on:click=move |_| executor.initiate(action.clone())
                        >
                            {label}
                        </button>
                    }
                }
            </For>
        </div>
    }
}

/// Confirmation and form overlays plus the success/error banners for one
/// executor instance.
#[component]
pub fn ActionDialog(executor: ActionExecutor) -> impl IntoView {
    let pending = executor.pending;
    let show_confirmation = executor.show_confirmation;
    let show_form = executor.show_form;
    let is_executing = executor.is_executing;
    let error = executor.error;
    let success = executor.success;

    let confirm_exec = StoredValue::new_local(executor.clone());
    let cancel_exec = StoredValue::new_local(executor.clone());
    let form_exec = StoredValue::new_local(executor.clone());
    let dismiss_exec = StoredValue::new_local(executor.clone());

    view! {
        <div class="action-dialogs">
            {move || {
                let dismiss = dismiss_exec.get_value();
                success.get().map(|msg| {
                    view! {
                        <div class="success-banner">
                            <span>{msg}</span>
                            <button class="link-btn" on:click=move |_| dismiss.clear_success()>
                                "Dismiss"
                            </button>
                        </div>
                    }
                })
            }}
            {move || {
                error.get().map(|msg| view! { <div class="error-banner">{msg}</div> })
            }}

            // Confirmation overlay
            {move || {
                let confirm_exec = confirm_exec.get_value();
                let cancel = cancel_exec.get_value();
                (show_confirmation.get())
                    .then(|| pending.get())
                    .flatten()
                    .map(|action| {
                        let message = action
                            .confirmation_message
                            .clone()
                            .unwrap_or_else(|| format!("{}?", action.label));
                        view! {
                            <div class="dialog-overlay">
                                <div class="confirm-dialog">
                                    <p>{message}</p>
                                    <div class="dialog-buttons">
                                        <button
                                            class="primary"
                                            on:click=move |_| confirm_exec.confirm()
                                            disabled=move || is_executing.get()
                                        >
                                            {move || {
                                                if is_executing.get() { "Working…" } else { "Confirm" }
                                            }}
                                        </button>
                                        <button on:click=move |_| cancel.cancel()>"Cancel"</button>
                                    </div>
                                </div>
                            </div>
                        }
                    })
            }}

            // Custom form overlay
            {move || {
                let form_exec = form_exec.get_value();
                (show_form.get())
                    .then(|| pending.get())
                    .flatten()
                    .and_then(|action| {
                        let renderer = form_exec.registry().form_for(&action.identifier)?;
                        let submit_exec = form_exec.clone();
                        let cancel_exec = form_exec.clone();
                        let ctx = ActionFormContext {
                            action,
                            on_submit: UnsyncCallback::new(move |data| {
                                submit_exec.submit_form(data)
                            }),
                            on_cancel: UnsyncCallback::new(move |()| cancel_exec.cancel()),
                        };
                        Some(view! {
                            <div class="dialog-overlay">
                                <div class="form-dialog">{renderer(ctx)}</div>
                            </div>
                        })
                    })
            }}
        </div>
    }
}
