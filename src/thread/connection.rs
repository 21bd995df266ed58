//! WebSocket wiring for shared thread connections.
//!
//! Opens the real socket for a thread key, installs the event handlers, and
//! re-dials with exponential backoff when the channel drops. Consumers go
//! through [`use_thread_connection`], which defers opening until `enabled`
//! and releases its hold on cleanup.

use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use crate::api;
use crate::models::{ThreadKey, Viewer};
use crate::thread::protocol::{ClientFrame, ServerFrame};
use crate::thread::registry::{ConnectionRegistry, ConnectionStatus, SharedConnection, Transport};

pub const RECONNECT_BASE_MS: u32 = 500;
pub const RECONNECT_CAP_MS: u32 = 10_000;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 6;
pub const HEARTBEAT_MS: u32 = 30_000;

/// Backoff delay before reconnect attempt `attempt` (zero-based), with
/// `jitter` in `[0, 1]` stretching the capped delay by up to half again.
pub fn backoff_delay_ms(attempt: u32, jitter: f64) -> u32 {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    let capped = RECONNECT_BASE_MS.saturating_mul(factor).min(RECONNECT_CAP_MS);
    let jitter = jitter.clamp(0.0, 1.0);
    capped + (capped as f64 * 0.5 * jitter) as u32
}

thread_local! {
    static REGISTRY: ConnectionRegistry<WsTransport> = ConnectionRegistry::new();
}

fn with_registry<R>(f: impl FnOnce(&ConnectionRegistry<WsTransport>) -> R) -> R {
    REGISTRY.with(f)
}

/// Thin wrapper making `web_sys::WebSocket` fit the registry's transport
/// seam. Dropping it stops the keepalive along with the socket.
pub struct WsTransport {
    ws: WebSocket,
    _heartbeat: Interval,
}

impl Transport for WsTransport {
    fn send_text(&self, text: &str) {
        if let Err(e) = self.ws.send_with_str(text) {
            log::warn!("websocket send failed: {e:?}");
        }
    }

    fn close(&self) {
        let _ = self.ws.close();
    }
}

/// Dials the thread channel and wires its events into the shared connection.
/// Returns `None` when the socket cannot even be constructed; a retry is
/// scheduled in that case.
fn open_socket(conn: &Rc<SharedConnection<WsTransport>>) -> Option<WsTransport> {
    let url = api::ws_url(conn.key());
    let ws = match WebSocket::new(&url) {
        Ok(ws) => ws,
        Err(e) => {
            log::error!("failed to open {url}: {e:?}");
            schedule_reconnect(Rc::clone(conn));
            return None;
        }
    };
    ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

    // --- onopen: mark read + become eligible to send typing ---
    let c = Rc::clone(conn);
    let onopen = Closure::<dyn Fn()>::new(move || c.handle_open());
    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    onopen.forget();

    // --- onmessage: decode and dispatch one frame ---
    let c = Rc::clone(conn);
    let onmessage = Closure::<dyn Fn(MessageEvent)>::new(move |ev: MessageEvent| {
        if let Some(text) = ev.data().as_string() {
            match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => c.handle_frame(frame),
                Err(e) => log::warn!("undecodable frame on {}: {e}", c.key()),
            }
        }
    });
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    // --- onerror: log only; onclose follows and owns recovery ---
    let key = conn.key().clone();
    let onerror = Closure::<dyn Fn()>::new(move || {
        log::error!("websocket error on {key}");
    });
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    // --- onclose: drop presence, then try to come back ---
    let c = Rc::clone(conn);
    let onclose = Closure::<dyn Fn(CloseEvent)>::new(move |_: CloseEvent| {
        c.handle_close();
        schedule_reconnect(Rc::clone(&c));
    });
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();

    // Keepalive; the server answers with a pong frame.
    let ws_ping = ws.clone();
    let heartbeat = Interval::new(HEARTBEAT_MS, move || {
        if ws_ping.ready_state() == WebSocket::OPEN {
            let frame = ClientFrame::Ping { timestamp: js_sys::Date::now() };
            if let Ok(json) = serde_json::to_string(&frame) {
                let _ = ws_ping.send_with_str(&json);
            }
        }
    });

    Some(WsTransport { ws, _heartbeat: heartbeat })
}

/// Schedules a re-dial with backoff, as long as some consumer still holds the
/// thread and the attempt cap is not exhausted.
fn schedule_reconnect(conn: Rc<SharedConnection<WsTransport>>) {
    let key = conn.key().clone();
    if !with_registry(|r| r.is_current(&conn)) {
        // Closed on purpose (last consumer released); nothing to revive.
        return;
    }

    let attempt = conn.record_reconnect_attempt();
    if attempt > MAX_RECONNECT_ATTEMPTS {
        log::warn!("giving up on {key} after {MAX_RECONNECT_ATTEMPTS} reconnect attempts");
        conn.status.set(ConnectionStatus::Disconnected);
        return;
    }

    conn.status.set(ConnectionStatus::Reconnecting);
    let delay = backoff_delay_ms(attempt - 1, js_sys::Math::random());
    log::debug!("reconnecting {key} in {delay}ms (attempt {attempt})");

    Timeout::new(delay, move || {
        // Identity check, not a key lookup: by the time this fires, the
        // entry may have been evicted and the key re-acquired by a new
        // mount with its own socket. Re-dialing for this (now orphaned)
        // connection would open a duplicate channel nothing can close.
        if !with_registry(|r| r.is_current(&conn)) || conn.has_transport() {
            return;
        }
        if let Some(transport) = open_socket(&conn) {
            conn.attach_transport(transport);
        }
    })
    .forget();
}

#[derive(Clone)]
struct ConnLease {
    conn: Rc<SharedConnection<WsTransport>>,
    listener_id: usize,
}

/// One consumer's hold on a shared thread connection.
#[derive(Clone, Copy)]
pub struct ThreadConnectionHandle {
    lease: RwSignal<Option<ConnLease>, LocalStorage>,
}

impl ThreadConnectionHandle {
    /// Live viewer list for the thread, empty while not connected.
    pub fn viewers(&self) -> Signal<Vec<Viewer>, LocalStorage> {
        let lease = self.lease;
        Signal::derive_local(move || {
            lease.get().map(|l| l.conn.viewers.get()).unwrap_or_default()
        })
    }

    pub fn status(&self) -> Signal<ConnectionStatus, LocalStorage> {
        let lease = self.lease;
        Signal::derive_local(move || {
            lease
                .get()
                .map(|l| l.conn.status.get())
                .unwrap_or(ConnectionStatus::Disconnected)
        })
    }

    /// Best-effort typing signal: dropped unless the socket is open.
    pub fn send_typing(&self, is_typing: bool) {
        if let Some(lease) = self.lease.get_untracked() {
            lease.conn.send_typing(is_typing);
        }
    }
}

/// Attaches the calling component to the shared connection for `key`.
///
/// The connection is not opened while `enabled` is false (deferred until an
/// auth scope is known, or a collapsed card is expanded). The key is fixed
/// for the component's lifetime; keyed views remount on identity changes,
/// which tears this hold down through `on_cleanup`.
pub fn use_thread_connection(
    key: ThreadKey,
    enabled: Signal<bool>,
    on_message_update: Rc<dyn Fn()>,
) -> ThreadConnectionHandle {
    let lease = RwSignal::new_local(None::<ConnLease>);

    let acquire_key = key.clone();
    Effect::new(move |_| {
        let enabled_now = enabled.get();
        let held = lease.with_untracked(|l| l.is_some());
        if enabled_now && !held {
            let conn = with_registry(|r| r.acquire(&acquire_key, |c| open_socket(c)));
            let listener_id = conn.add_message_listener(Rc::clone(&on_message_update));
            lease.set(Some(ConnLease { conn, listener_id }));
        } else if !enabled_now && held {
            release_lease(lease, &acquire_key);
        }
    });

    on_cleanup(move || release_lease(lease, &key));

    ThreadConnectionHandle { lease }
}

fn release_lease(lease: RwSignal<Option<ConnLease>, LocalStorage>, key: &ThreadKey) {
    let taken = lease.try_update(|l| l.take()).flatten();
    if let Some(lease) = taken {
        lease.conn.remove_message_listener(lease.listener_id);
        with_registry(|r| r.release(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_without_jitter() {
        assert_eq!(backoff_delay_ms(0, 0.0), 500);
        assert_eq!(backoff_delay_ms(1, 0.0), 1_000);
        assert_eq!(backoff_delay_ms(2, 0.0), 2_000);
        assert_eq!(backoff_delay_ms(3, 0.0), 4_000);
        assert_eq!(backoff_delay_ms(4, 0.0), 8_000);
    }

    #[test]
    fn backoff_caps_at_ten_seconds() {
        assert_eq!(backoff_delay_ms(5, 0.0), RECONNECT_CAP_MS);
        assert_eq!(backoff_delay_ms(20, 0.0), RECONNECT_CAP_MS);
        assert_eq!(backoff_delay_ms(40, 0.0), RECONNECT_CAP_MS);
    }

    #[test]
    fn jitter_stretches_by_at_most_half() {
        for attempt in 0..8 {
            let base = backoff_delay_ms(attempt, 0.0);
            let max = backoff_delay_ms(attempt, 1.0);
            assert_eq!(max, base + base / 2);
            let mid = backoff_delay_ms(attempt, 0.5);
            assert!(mid >= base && mid <= max);
        }
    }

    #[test]
    fn out_of_range_jitter_is_clamped() {
        assert_eq!(backoff_delay_ms(0, -1.0), backoff_delay_ms(0, 0.0));
        assert_eq!(backoff_delay_ms(0, 7.5), backoff_delay_ms(0, 1.0));
    }
}
