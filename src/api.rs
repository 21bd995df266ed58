use gloo_net::http::Request;

use crate::error::ApiError;
use crate::models::{
    ActionDescriptor, CurrentUser, ExecuteActionRequest, MediaItem, MessageBody, ThreadKey,
    ThreadMessage,
};
use crate::rich_text::RichTextDoc;

/// Base URL of the backend API server.
const API_BASE: &str = "http://localhost:3000";

fn thread_base(key: &ThreadKey) -> String {
    format!(
        "{API_BASE}/api/threads/{}/{}",
        key.threadable_type, key.threadable_id
    )
}

/// Fetches the full message history for a thread, oldest first. The result
/// always replaces local state wholesale; refetching is idempotent.
pub async fn fetch_messages(key: &ThreadKey) -> Result<Vec<ThreadMessage>, ApiError> {
    let resp = Request::get(&format!("{}/messages", thread_base(key)))
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    resp.json::<Vec<ThreadMessage>>()
        .await
        .map_err(ApiError::decode)
}

/// Creates a message in a thread. The caller refetches afterwards rather than
/// inserting the response locally.
pub async fn create_message(
    key: &ThreadKey,
    content: &RichTextDoc,
) -> Result<ThreadMessage, ApiError> {
    let body = MessageBody { content: content.clone() };

    let resp = Request::post(&format!("{}/messages", thread_base(key)))
        .json(&body)
        .map_err(ApiError::encode)?
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    resp.json::<ThreadMessage>().await.map_err(ApiError::decode)
}

/// Replaces a message's content. Author checks are enforced server-side; the
/// UI only pre-filters.
pub async fn edit_message(
    key: &ThreadKey,
    message_id: &str,
    content: &RichTextDoc,
) -> Result<ThreadMessage, ApiError> {
    let body = MessageBody { content: content.clone() };

    let resp = Request::patch(&format!("{}/messages/{message_id}", thread_base(key)))
        .json(&body)
        .map_err(ApiError::encode)?
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    resp.json::<ThreadMessage>().await.map_err(ApiError::decode)
}

pub async fn delete_message(key: &ThreadKey, message_id: &str) -> Result<(), ApiError> {
    let resp = Request::delete(&format!("{}/messages/{message_id}", thread_base(key)))
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    Ok(())
}

/// Executes an action, object-scoped when an object id is bound, otherwise
/// group-scoped.
pub async fn execute_action(
    action_group: &str,
    identifier: &str,
    object_id: Option<&str>,
    data: Option<serde_json::Value>,
) -> Result<(), ApiError> {
    let url = match object_id {
        Some(id) => format!("{API_BASE}/api/actions/{action_group}/{identifier}/{id}/execute"),
        None => format!("{API_BASE}/api/actions/{action_group}/{identifier}/execute"),
    };

    let resp = Request::post(&url)
        .json(&ExecuteActionRequest { data })
        .map_err(ApiError::encode)?
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    Ok(())
}

/// Fetches the actions currently available on an object. Actions are never
/// cached; the backend re-evaluates availability on every request.
pub async fn fetch_object_actions(
    object_type: &str,
    object_id: &str,
) -> Result<Vec<ActionDescriptor>, ApiError> {
    let resp = Request::get(&format!("{API_BASE}/api/{object_type}/{object_id}/actions"))
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    resp.json::<Vec<ActionDescriptor>>()
        .await
        .map_err(ApiError::decode)
}

pub async fn fetch_deliverable_media(deliverable_id: &str) -> Result<Vec<MediaItem>, ApiError> {
    let resp = Request::get(&format!("{API_BASE}/api/deliverables/{deliverable_id}/media"))
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    resp.json::<Vec<MediaItem>>().await.map_err(ApiError::decode)
}

pub async fn fetch_current_user() -> Result<CurrentUser, ApiError> {
    let resp = Request::get(&format!("{API_BASE}/api/me"))
        .send()
        .await
        .map_err(ApiError::network)?;

    if !resp.ok() {
        return Err(ApiError::Status { status: resp.status() });
    }

    resp.json::<CurrentUser>().await.map_err(ApiError::decode)
}

/// Returns the WebSocket URL for a thread's real-time channel.
pub fn ws_url(key: &ThreadKey) -> String {
    format!(
        "ws://localhost:3000/ws/threads/{}/{}",
        key.threadable_type, key.threadable_id
    )
}
