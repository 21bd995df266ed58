//! Reference-counted connection registry.
//!
//! One live channel per thread key, shared by every mounted surface: the
//! first consumer to acquire a key opens the socket, later consumers attach
//! to the same connection, and the last release closes it. This replaces the
//! one-socket-per-mount pattern, so a drawer and an inline feed showing the
//! same thread share a single connection and a single presence view.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use leptos::prelude::*;

use crate::models::{ThreadKey, Viewer};
use crate::thread::presence;
use crate::thread::protocol::{ClientFrame, ServerFrame};

/// Lifecycle of a shared connection. `Reconnecting` is distinct from
/// `Disconnected`: the former still has retries scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// Minimal outbound surface of a socket, so the registry and connection
/// bookkeeping stay testable off-wasm.
pub trait Transport {
    fn send_text(&self, text: &str);
    fn close(&self);
}

/// Per-thread shared connection state. Owned by the registry, handed to
/// consumers as `Rc` so its signals are shared across every surface showing
/// the thread.
pub struct SharedConnection<T: Transport> {
    key: ThreadKey,
    transport: RefCell<Option<T>>,
    refcount: Cell<usize>,
    reconnect_attempts: Cell<u32>,
    pub status: RwSignal<ConnectionStatus>,
    pub viewers: RwSignal<Vec<Viewer>>,
    listeners: RefCell<HashMap<usize, Rc<dyn Fn()>>>,
    next_listener_id: Cell<usize>,
}

impl<T: Transport> SharedConnection<T> {
    fn new(key: ThreadKey) -> Self {
        Self {
            key,
            transport: RefCell::new(None),
            refcount: Cell::new(0),
            reconnect_attempts: Cell::new(0),
            status: RwSignal::new(ConnectionStatus::Connecting),
            viewers: RwSignal::new(Vec::new()),
            listeners: RefCell::new(HashMap::new()),
            next_listener_id: Cell::new(0),
        }
    }

    pub fn key(&self) -> &ThreadKey {
        &self.key
    }

    /// Installs (or replaces) the live transport. Dropping a previous
    /// transport closes it.
    pub fn attach_transport(&self, transport: T) {
        if let Some(old) = self.transport.borrow_mut().replace(transport) {
            old.close();
        }
    }

    pub fn has_transport(&self) -> bool {
        self.transport.borrow().is_some()
    }

    pub fn record_reconnect_attempt(&self) -> u32 {
        let next = self.reconnect_attempts.get() + 1;
        self.reconnect_attempts.set(next);
        next
    }

    /// Registers a callback for `message_update` signals. Returns an id for
    /// later removal.
    pub fn add_message_listener(&self, listener: Rc<dyn Fn()>) -> usize {
        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        self.listeners.borrow_mut().insert(id, listener);
        id
    }

    pub fn remove_message_listener(&self, id: usize) {
        self.listeners.borrow_mut().remove(&id);
    }

    /// Sends a frame if the socket is currently open; otherwise drops it.
    /// Outbound frames are never queued or retried.
    pub fn send_frame(&self, frame: &ClientFrame) {
        if self.status.get_untracked() != ConnectionStatus::Connected {
            return;
        }
        if let Some(transport) = self.transport.borrow().as_ref() {
            match serde_json::to_string(frame) {
                Ok(json) => transport.send_text(&json),
                Err(e) => log::error!("failed to serialize frame for {}: {e}", self.key),
            }
        }
    }

    pub fn send_typing(&self, is_typing: bool) {
        self.send_frame(&ClientFrame::Typing { is_typing });
    }

    /// Socket opened: announce mark-read (fire-and-forget) and reset the
    /// retry counter.
    pub fn handle_open(&self) {
        self.reconnect_attempts.set(0);
        self.status.set(ConnectionStatus::Connected);
        self.send_frame(&ClientFrame::MarkRead);
        log::debug!("thread channel open: {}", self.key);
    }

    /// Dispatches one inbound frame.
    pub fn handle_frame(&self, frame: ServerFrame) {
        match &frame {
            ServerFrame::MessageUpdate => {
                // No body on the wire; every surface re-pulls over REST.
                let listeners: Vec<Rc<dyn Fn()>> =
                    self.listeners.borrow().values().cloned().collect();
                for listener in listeners {
                    listener();
                }
            }
            ServerFrame::UserJoined { .. }
            | ServerFrame::UserLeft { .. }
            | ServerFrame::TypingUpdate { .. } => {
                self.viewers.update(|viewers| presence::apply(viewers, &frame));
            }
            ServerFrame::MarkedRead | ServerFrame::Pong => {}
            ServerFrame::Unknown => {
                log::debug!("ignoring unknown frame on {}", self.key);
            }
        }
    }

    /// Socket closed: presence never survives a disconnect. A stale "still
    /// viewing" list is worse than the flicker on reconnect.
    pub fn handle_close(&self) {
        self.transport.borrow_mut().take();
        self.viewers.set(Vec::new());
    }

    fn close(&self) {
        if let Some(transport) = self.transport.borrow_mut().take() {
            transport.close();
        }
        self.status.set(ConnectionStatus::Disconnected);
    }
}

/// Registry of shared connections, keyed by thread identity.
pub struct ConnectionRegistry<T: Transport> {
    connections: RefCell<HashMap<ThreadKey, Rc<SharedConnection<T>>>>,
}

impl<T: Transport> ConnectionRegistry<T> {
    pub fn new() -> Self {
        Self { connections: RefCell::new(HashMap::new()) }
    }

    /// Acquires the shared connection for `key`, opening a transport via
    /// `open` only when this is the first consumer.
    pub fn acquire(
        &self,
        key: &ThreadKey,
        open: impl FnOnce(&Rc<SharedConnection<T>>) -> Option<T>,
    ) -> Rc<SharedConnection<T>> {
        if let Some(existing) = self.connections.borrow().get(key) {
            existing.refcount.set(existing.refcount.get() + 1);
            return Rc::clone(existing);
        }

        let conn = Rc::new(SharedConnection::new(key.clone()));
        conn.refcount.set(1);
        self.connections.borrow_mut().insert(key.clone(), Rc::clone(&conn));

        // Insert before opening so event handlers created by `open` can
        // already see the registry entry.
        if let Some(transport) = open(&conn) {
            conn.attach_transport(transport);
        }
        conn
    }

    /// Releases one consumer's hold on `key`. The last release closes the
    /// transport and evicts the entry.
    pub fn release(&self, key: &ThreadKey) {
        let mut connections = self.connections.borrow_mut();
        let Some(conn) = connections.get(key) else {
            return;
        };
        let remaining = conn.refcount.get().saturating_sub(1);
        conn.refcount.set(remaining);
        if remaining == 0 {
            let conn = connections.remove(key);
            drop(connections);
            if let Some(conn) = conn {
                conn.close();
            }
        }
    }

    /// Whether `conn` is still the registry's live entry for its key.
    /// Reconnect timers check identity, not just the key: an evicted
    /// connection must never re-dial, even after a later consumer re-opens
    /// the same thread under a fresh entry.
    pub fn is_current(&self, conn: &Rc<SharedConnection<T>>) -> bool {
        self.connections
            .borrow()
            .get(conn.key())
            .is_some_and(|current| Rc::ptr_eq(current, conn))
    }

    #[allow(dead_code)]
    pub fn open_count(&self) -> usize {
        self.connections.borrow().len()
    }
}

impl<T: Transport> Default for ConnectionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct FakeTransport {
        sent: Rc<RefCell<Vec<String>>>,
        closed: Rc<Cell<bool>>,
    }

    impl Transport for FakeTransport {
        fn send_text(&self, text: &str) {
            self.sent.borrow_mut().push(text.to_string());
        }
        fn close(&self) {
            self.closed.set(true);
        }
    }

    fn key() -> ThreadKey {
        ThreadKey::new("media", "m-1")
    }

    fn viewer(id: &str) -> Viewer {
        Viewer { user_id: id.into(), name: id.into(), is_typing: false }
    }

    #[test]
    fn mount_unmount_mount_leaves_exactly_one_connection() {
        let registry = ConnectionRegistry::<FakeTransport>::new();
        let first = FakeTransport::default();
        let first_closed = first.closed.clone();

        registry.acquire(&key(), |_| Some(first));
        assert_eq!(registry.open_count(), 1);

        registry.release(&key());
        assert_eq!(registry.open_count(), 0);
        assert!(first_closed.get());

        let second = FakeTransport::default();
        let second_closed = second.closed.clone();
        registry.acquire(&key(), |_| Some(second));
        assert_eq!(registry.open_count(), 1);
        assert!(!second_closed.get());

        registry.release(&key());
        assert_eq!(registry.open_count(), 0);
        assert!(second_closed.get());
    }

    #[test]
    fn concurrent_consumers_share_one_transport() {
        let registry = ConnectionRegistry::<FakeTransport>::new();
        let mut opens = 0;

        let a = registry.acquire(&key(), |_| {
            opens += 1;
            Some(FakeTransport::default())
        });
        let b = registry.acquire(&key(), |_| {
            opens += 1;
            Some(FakeTransport::default())
        });

        assert_eq!(opens, 1);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(registry.open_count(), 1);

        // First consumer unmounts: the connection stays up for the second.
        registry.release(&key());
        assert_eq!(registry.open_count(), 1);
        registry.release(&key());
        assert_eq!(registry.open_count(), 0);
    }

    #[test]
    fn open_sends_mark_read_and_typing_requires_connected() {
        let registry = ConnectionRegistry::<FakeTransport>::new();
        let transport = FakeTransport::default();
        let sent = transport.sent.clone();

        let conn = registry.acquire(&key(), |_| Some(transport));

        // Not yet open: typing is dropped, never queued.
        conn.send_typing(true);
        assert!(sent.borrow().is_empty());

        conn.handle_open();
        assert_eq!(conn.status.get_untracked(), ConnectionStatus::Connected);
        assert_eq!(sent.borrow().as_slice(), [r#"{"type":"mark_read"}"#]);

        conn.send_typing(true);
        assert_eq!(sent.borrow().len(), 2);
        assert!(sent.borrow()[1].contains(r#""is_typing":true"#));
    }

    #[test]
    fn message_update_fans_out_to_every_listener() {
        let registry = ConnectionRegistry::<FakeTransport>::new();
        let conn = registry.acquire(&key(), |_| Some(FakeTransport::default()));

        let count_a = Rc::new(Cell::new(0));
        let count_b = Rc::new(Cell::new(0));
        let (a, b) = (count_a.clone(), count_b.clone());
        let id_a = conn.add_message_listener(Rc::new(move || a.set(a.get() + 1)));
        conn.add_message_listener(Rc::new(move || b.set(b.get() + 1)));

        conn.handle_frame(ServerFrame::MessageUpdate);
        conn.handle_frame(ServerFrame::MessageUpdate);
        assert_eq!(count_a.get(), 2);
        assert_eq!(count_b.get(), 2);

        conn.remove_message_listener(id_a);
        conn.handle_frame(ServerFrame::MessageUpdate);
        assert_eq!(count_a.get(), 2);
        assert_eq!(count_b.get(), 3);
    }

    #[test]
    fn close_clears_presence() {
        let registry = ConnectionRegistry::<FakeTransport>::new();
        let conn = registry.acquire(&key(), |_| Some(FakeTransport::default()));
        conn.handle_open();
        conn.handle_frame(ServerFrame::UserJoined { viewers: vec![viewer("u1"), viewer("u2")] });
        assert_eq!(conn.viewers.get_untracked().len(), 2);

        conn.handle_close();
        assert!(conn.viewers.get_untracked().is_empty());
        assert!(!conn.has_transport());
    }

    #[test]
    fn evicted_connection_is_never_current_again() {
        let registry = ConnectionRegistry::<FakeTransport>::new();
        let stale = registry.acquire(&key(), |_| Some(FakeTransport::default()));
        assert!(registry.is_current(&stale));

        // Last consumer releases: the entry is evicted.
        registry.release(&key());
        assert!(!registry.is_current(&stale));

        // A new mount on the same key gets a fresh entry; the stale handle
        // must not pass the identity check it would use to re-dial.
        let fresh = registry.acquire(&key(), |_| Some(FakeTransport::default()));
        assert!(registry.is_current(&fresh));
        assert!(!registry.is_current(&stale));

        registry.release(&key());
    }

    #[test]
    fn release_of_unknown_key_is_harmless() {
        let registry = ConnectionRegistry::<FakeTransport>::new();
        registry.release(&key());
        assert_eq!(registry.open_count(), 0);
    }
}
