//! Guarded execution of backend-declared actions.
//!
//! State machine: `idle -> {confirming | form_open} -> executing -> idle`,
//! with the error message retained on failure until the next attempt or an
//! explicit cancel. At most one action is pending per executor; a second
//! `initiate` replaces it, nothing is queued.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::actions::registry::ActionFormRegistry;
use crate::api;
use crate::models::ActionDescriptor;

/// Which state an initiated action enters. A registered form always wins
/// over a confirmation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionEntry {
    Form,
    Confirm,
    Immediate,
}

pub fn entry_state(action: &ActionDescriptor, has_form: bool) -> ActionEntry {
    if has_form {
        ActionEntry::Form
    } else if action
        .confirmation_message
        .as_deref()
        .is_some_and(|m| !m.is_empty())
    {
        ActionEntry::Confirm
    } else {
        ActionEntry::Immediate
    }
}

/// Parent of a detail path: truncate at the last segment.
/// `/deliverables/abc123` -> `/deliverables`.
pub fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        None | Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

#[derive(Clone)]
pub struct ActionExecutor {
    object_id: Option<String>,
    registry: Rc<ActionFormRegistry>,
    pub pending: RwSignal<Option<ActionDescriptor>>,
    pub show_confirmation: RwSignal<bool>,
    pub show_form: RwSignal<bool>,
    pub is_executing: RwSignal<bool>,
    pub error: RwSignal<Option<String>>,
    pub success: RwSignal<Option<String>>,
    invalidate: Rc<dyn Fn(&str, Option<&str>)>,
    on_success: Rc<dyn Fn()>,
    on_error: Rc<dyn Fn(String)>,
}

impl ActionExecutor {
    pub fn new(registry: Rc<ActionFormRegistry>, object_id: Option<String>) -> Self {
        Self {
            object_id,
            registry,
            pending: RwSignal::new(None),
            show_confirmation: RwSignal::new(false),
            show_form: RwSignal::new(false),
            is_executing: RwSignal::new(false),
            error: RwSignal::new(None),
            success: RwSignal::new(None),
            invalidate: Rc::new(|group, object_id| {
                log::debug!("no cache invalidation registered for {group} ({object_id:?})");
            }),
            on_success: Rc::new(|| {}),
            on_error: Rc::new(|_| {}),
        }
    }

    /// Replaces the default no-op invalidation with a caller-supplied
    /// refetch, keyed by action group and bound object id.
    pub fn with_invalidate(mut self, f: impl Fn(&str, Option<&str>) + 'static) -> Self {
        self.invalidate = Rc::new(f);
        self
    }

    pub fn with_on_success(mut self, f: impl Fn() + 'static) -> Self {
        self.on_success = Rc::new(f);
        self
    }

    pub fn with_on_error(mut self, f: impl Fn(String) + 'static) -> Self {
        self.on_error = Rc::new(f);
        self
    }

    pub fn registry(&self) -> &ActionFormRegistry {
        &self.registry
    }

    /// Starts an action: form if one is registered, else confirmation if the
    /// backend asks for one, else immediate execution.
    pub fn initiate(&self, action: ActionDescriptor) {
        if !action.available {
            return;
        }
        self.error.set(None);
        self.success.set(None);

        match entry_state(&action, self.registry.has_form(&action.identifier)) {
            ActionEntry::Form => {
                self.pending.set(Some(action));
                self.show_form.set(true);
                self.show_confirmation.set(false);
            }
            ActionEntry::Confirm => {
                self.pending.set(Some(action));
                self.show_confirmation.set(true);
                self.show_form.set(false);
            }
            ActionEntry::Immediate => {
                self.pending.set(Some(action));
                self.show_form.set(false);
                self.show_confirmation.set(false);
                self.execute(None);
            }
        }
    }

    pub fn confirm(&self) {
        if !self.show_confirmation.get_untracked() {
            return;
        }
        self.show_confirmation.set(false);
        self.execute(None);
    }

    pub fn submit_form(&self, data: serde_json::Value) {
        if !self.show_form.get_untracked() {
            return;
        }
        self.show_form.set(false);
        self.execute(Some(data));
    }

    /// Back to idle, discarding any pending action, form state, and banners.
    pub fn cancel(&self) {
        self.pending.set(None);
        self.show_confirmation.set(false);
        self.show_form.set(false);
        self.error.set(None);
        self.success.set(None);
    }

    /// Dismisses the success banner.
    pub fn clear_success(&self) {
        self.success.set(None);
    }

    fn execute(&self, data: Option<serde_json::Value>) {
        let Some(action) = self.pending.get_untracked() else {
            return;
        };
        self.is_executing.set(true);

        let this = self.clone();
        spawn_local(async move {
            let result = api::execute_action(
                &action.action_group,
                &action.identifier,
                this.object_id.as_deref(),
                data,
            )
            .await;
            this.is_executing.set(false);
            clear_completed(this.pending, &action);

            match result {
                Ok(()) => {
                    this.success.set(Some(format!("{} complete", action.label)));
                    (this.invalidate)(&action.action_group, this.object_id.as_deref());
                    (this.on_success)();
                    if action.should_redirect_to_parent {
                        redirect_to_parent();
                    }
                }
                Err(e) => {
                    log::error!("action {} failed: {e}", action.identifier);
                    let message = e.to_string();
                    this.error.set(Some(message.clone()));
                    (this.on_error)(message);
                }
            }
        });
    }
}

/// Clears `pending` only while it still holds the action whose execution
/// just finished. A newer `initiate` replaces the pending action mid-flight;
/// its confirmation or form state must survive the older completion.
fn clear_completed(pending: RwSignal<Option<ActionDescriptor>>, executed: &ActionDescriptor) {
    pending.update(|p| {
        if p.as_ref().is_some_and(|a| a.identifier == executed.identifier) {
            *p = None;
        }
    });
}

fn redirect_to_parent() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let location = window.location();
    if let Ok(path) = location.pathname() {
        let _ = location.set_pathname(&parent_path(&path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::registry::ActionKind;

    fn action(identifier: &str, confirmation: Option<&str>) -> ActionDescriptor {
        ActionDescriptor {
            identifier: identifier.to_string(),
            label: identifier.to_string(),
            action_group: "deliverables".to_string(),
            confirmation_message: confirmation.map(str::to_string),
            priority: 0,
            available: true,
            should_redirect_to_parent: false,
        }
    }

    fn registry_with_form(kind: ActionKind) -> Rc<ActionFormRegistry> {
        let mut registry = ActionFormRegistry::new();
        registry.register(kind, Rc::new(|_ctx| ().into_any()));
        Rc::new(registry)
    }

    #[test]
    fn form_takes_precedence_over_confirmation() {
        let action = action("request_revision", Some("Are you sure?"));
        assert_eq!(entry_state(&action, true), ActionEntry::Form);
        assert_eq!(entry_state(&action, false), ActionEntry::Confirm);
    }

    #[test]
    fn no_form_no_confirmation_executes_immediately() {
        assert_eq!(entry_state(&action("archive", None), false), ActionEntry::Immediate);
        // An empty confirmation string is treated as absent.
        assert_eq!(entry_state(&action("archive", Some("")), false), ActionEntry::Immediate);
    }

    #[test]
    fn parent_path_truncates_the_last_segment() {
        assert_eq!(parent_path("/deliverables/abc123"), "/deliverables");
        assert_eq!(parent_path("/brands/b1/campaigns/c2"), "/brands/b1/campaigns");
        assert_eq!(parent_path("/deliverables/abc123/"), "/deliverables");
        assert_eq!(parent_path("/deliverables"), "/");
        assert_eq!(parent_path("/"), "/");
    }

    #[test]
    fn initiating_a_form_action_never_shows_confirmation() {
        let executor = ActionExecutor::new(
            registry_with_form(ActionKind::RequestRevision),
            Some("abc123".into()),
        );
        executor.initiate(action("request_revision", Some("Really?")));
        assert!(executor.show_form.get_untracked());
        assert!(!executor.show_confirmation.get_untracked());
        assert!(executor.pending.get_untracked().is_some());
    }

    #[test]
    fn confirmation_gated_action_waits_for_confirm() {
        let executor = ActionExecutor::new(Rc::new(ActionFormRegistry::new()), None);
        executor.initiate(action("archive", Some("Archive this?")));
        assert!(executor.show_confirmation.get_untracked());
        assert!(!executor.show_form.get_untracked());
        assert!(!executor.is_executing.get_untracked());
    }

    #[test]
    fn second_initiate_replaces_the_pending_action() {
        let executor = ActionExecutor::new(Rc::new(ActionFormRegistry::new()), None);
        executor.initiate(action("archive", Some("Archive this?")));
        executor.initiate(action("publish", Some("Publish this?")));
        let pending = executor.pending.get_untracked().unwrap();
        assert_eq!(pending.identifier, "publish");
        assert!(executor.show_confirmation.get_untracked());
    }

    #[test]
    fn unavailable_actions_are_ignored() {
        let executor = ActionExecutor::new(Rc::new(ActionFormRegistry::new()), None);
        let mut unavailable = action("archive", Some("Archive this?"));
        unavailable.available = false;
        executor.initiate(unavailable);
        assert!(executor.pending.get_untracked().is_none());
    }

    #[test]
    fn cancel_returns_to_idle_and_clears_the_banners() {
        let executor = ActionExecutor::new(Rc::new(ActionFormRegistry::new()), None);
        executor.initiate(action("archive", Some("Archive this?")));
        executor.error.set(Some("previous failure".into()));
        executor.success.set(Some("publish complete".into()));
        executor.cancel();
        assert!(executor.pending.get_untracked().is_none());
        assert!(!executor.show_confirmation.get_untracked());
        assert!(!executor.show_form.get_untracked());
        assert!(executor.error.get_untracked().is_none());
        assert!(executor.success.get_untracked().is_none());
    }

    #[test]
    fn success_banner_can_be_dismissed() {
        let executor = ActionExecutor::new(Rc::new(ActionFormRegistry::new()), None);
        executor.success.set(Some("archive complete".into()));
        executor.clear_success();
        assert!(executor.success.get_untracked().is_none());
    }

    #[test]
    fn completion_spares_a_newer_pending_action() {
        // Publish was initiated while archive was still executing; archive
        // finishing must not tear down publish's confirmation state.
        let pending = RwSignal::new(Some(action("publish", Some("Publish this?"))));
        clear_completed(pending, &action("archive", None));
        assert_eq!(pending.get_untracked().unwrap().identifier, "publish");

        clear_completed(pending, &action("publish", None));
        assert!(pending.get_untracked().is_none());
    }
}
