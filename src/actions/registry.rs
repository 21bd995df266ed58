//! Action form registry.
//!
//! Backend actions arrive as string identifiers. The client knows a closed
//! set of kinds that carry a custom form. Any other identifier, even one
//! this build has never heard of, falls through to direct execution as the
//! explicit default.

use std::collections::HashMap;
use std::rc::Rc;

use leptos::prelude::*;

use crate::models::ActionDescriptor;

/// The action identifiers this client can attach a form to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Approve,
    Reject,
    RequestRevision,
    SubmitForReview,
    Archive,
    Publish,
    MarkPaid,
}

impl ActionKind {
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "approve" => Some(ActionKind::Approve),
            "reject" => Some(ActionKind::Reject),
            "request_revision" => Some(ActionKind::RequestRevision),
            "submit_for_review" => Some(ActionKind::SubmitForReview),
            "archive" => Some(ActionKind::Archive),
            "publish" => Some(ActionKind::Publish),
            "mark_paid" => Some(ActionKind::MarkPaid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
            ActionKind::RequestRevision => "request_revision",
            ActionKind::SubmitForReview => "submit_for_review",
            ActionKind::Archive => "archive",
            ActionKind::Publish => "publish",
            ActionKind::MarkPaid => "mark_paid",
        }
    }
}

/// Everything a form needs to render and hand its data back.
pub struct ActionFormContext {
    pub action: ActionDescriptor,
    pub on_submit: UnsyncCallback<serde_json::Value>,
    pub on_cancel: UnsyncCallback<()>,
}

pub type FormRenderer = Rc<dyn Fn(ActionFormContext) -> AnyView>;

/// Maps action kinds to their form renderers.
#[derive(Clone, Default)]
pub struct ActionFormRegistry {
    forms: HashMap<ActionKind, FormRenderer>,
}

impl ActionFormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ActionKind, renderer: FormRenderer) {
        log::debug!("form registered for action '{}'", kind.as_str());
        self.forms.insert(kind, renderer);
    }

    /// Renderer for an identifier, or `None` when the action executes
    /// without a form.
    pub fn form_for(&self, identifier: &str) -> Option<FormRenderer> {
        let kind = ActionKind::from_identifier(identifier)?;
        self.forms.get(&kind).cloned()
    }

    pub fn has_form(&self, identifier: &str) -> bool {
        self.form_for(identifier).is_some()
    }
}
