//! Real-time thread synchronization: one shared WebSocket per thread key,
//! presence and typing state, and REST-backed message history.

pub mod connection;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod sync;
pub mod typing;
